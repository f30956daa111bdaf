use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use serde::Serialize;
use tipbot_core::errors::InterfaceError;
use tipbot_slack::{CommandFields, CommandInterpreter, CommandReply};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const WEBHOOK_PATH: &str = "/command-webhook";

#[derive(Clone)]
pub struct WebhookState {
    interpreter: Arc<CommandInterpreter>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    correlation_id: &'a str,
}

#[derive(Debug)]
pub struct WebhookError(InterfaceError);

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body =
            ErrorBody { error: self.0.user_message(), correlation_id: self.0.correlation_id() };
        (status, Json(body)).into_response()
    }
}

pub fn router(interpreter: Arc<CommandInterpreter>) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(command_webhook))
        .with_state(WebhookState { interpreter })
}

/// Slack slash-command endpoint. The reply JSON is posted back into the channel by Slack.
pub async fn command_webhook(
    State(state): State<WebhookState>,
    form: Result<Form<CommandFields>, FormRejection>,
) -> Result<Json<CommandReply>, WebhookError> {
    let correlation_id = Uuid::new_v4().to_string();
    // Unreadable bodies are handled like a delivery with every field missing.
    let fields = match form {
        Ok(Form(fields)) => fields,
        Err(rejection) => {
            warn!(
                event_name = "server.webhook.unreadable_form",
                correlation_id = %correlation_id,
                rejection = %rejection,
                "slash command body is not a form; treating all fields as empty"
            );
            CommandFields::default()
        }
    };
    info!(
        event_name = "server.webhook.received",
        correlation_id = %correlation_id,
        team_id = %fields.get("team_id"),
        user_id = %fields.get("user_id"),
        command = %fields.get("command"),
        "slash command received"
    );

    match state.interpreter.interpret(&fields, &correlation_id).await {
        Ok(reply) => Ok(Json(reply)),
        Err(failure) => {
            error!(
                event_name = "server.webhook.failed",
                correlation_id = %correlation_id,
                error = %failure,
                "slash command could not be handled"
            );
            Err(WebhookError(failure.into_interface(correlation_id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tipbot_agent::ChatClient;
    use tipbot_core::domain::tip::{TipRequest, TipResponse};
    use tipbot_core::domain::user::SlackUser;
    use tipbot_core::messages::{MessageCatalog, DEFAULT_INFO_URL};
    use tipbot_db::InMemorySlackUserRepository;
    use tipbot_slack::CommandInterpreter;
    use tipbot_tipping::{TipError, TipService};
    use tower::ServiceExt;

    use super::{router, WEBHOOK_PATH};

    struct StaticTipService {
        outcome: Result<Value, u16>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl TipService for StaticTipService {
        async fn send_tip(&self, _request: &TipRequest) -> Result<TipResponse, TipError> {
            *self.calls.lock().expect("calls lock") += 1;
            match &self.outcome {
                Ok(value) => Ok(TipResponse::from_value(value.clone())),
                Err(status) => Err(TipError::Decode {
                    status: *status,
                    message: "upstream unavailable".to_string(),
                }),
            }
        }
    }

    struct EchoChat;

    #[async_trait]
    impl ChatClient for EchoChat {
        async fn ask(&self, text: &str) -> anyhow::Result<String> {
            Ok(format!("echo:{}", text.trim()))
        }
    }

    async fn app(outcome: Result<Value, u16>) -> Router {
        let users = Arc::new(InMemorySlackUserRepository::default());
        users.insert(SlackUser::new("alice", "T1", "U1")).await;
        users.insert(SlackUser::new("bob", "T1", "U2")).await;

        let interpreter = CommandInterpreter::new(
            users,
            Arc::new(StaticTipService { outcome, calls: Mutex::new(0) }),
            Arc::new(EchoChat),
            Arc::new(MessageCatalog::new(DEFAULT_INFO_URL).expect("catalog")),
            "changetip-cleverbot",
        );

        router(Arc::new(interpreter))
    }

    fn form_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(WEBHOOK_PATH)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    const ALICE: &str = "token=tok&team_id=T1&team_domain=acme&channel_id=C1&channel_name=general\
                         &user_id=U1&user_name=alice&command=%2Fchangetip";

    #[tokio::test]
    async fn tip_reply_is_returned_as_json_text() {
        let app = app(Ok(json!({
            "state": "ok",
            "tip": {"status": "finished", "amount_display": "$1", "receiver": "bob"}
        })))
        .await;

        let response = app
            .oneshot(form_request(&format!("{ALICE}&text=give+%3C%40U2%3E+%241")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"text": "The tip has been delivered, $1 has been added to bob's ChangeTip wallet."})
        );
    }

    #[tokio::test]
    async fn chat_reply_carries_username() {
        let app = app(Ok(json!({}))).await;

        let response = app
            .oneshot(form_request(&format!("{ALICE}&text=changetip+hello")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"text": "echo:hello", "username": "changetip-cleverbot"})
        );
    }

    #[tokio::test]
    async fn unknown_sender_is_greeted() {
        let app = app(Ok(json!({}))).await;

        let response = app
            .oneshot(form_request("team_id=T1&user_id=U7&user_name=carol&text=hi"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let text = json_body(response).await["text"].as_str().unwrap_or_default().to_string();
        assert!(text.starts_with("Nice to meet you, carol!"));
    }

    #[tokio::test]
    async fn tipping_outage_maps_to_service_unavailable() {
        let app = app(Err(502)).await;

        let response = app
            .oneshot(form_request(&format!("{ALICE}&text=give+%3C%40U2%3E+%241")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(
            body["error"],
            "The service is temporarily unavailable. Please retry shortly."
        );
        assert!(body["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn non_form_body_is_read_as_empty_fields() {
        let app = app(Ok(json!({}))).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(WEBHOOK_PATH)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"text":"hi"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let text = json_body(response).await["text"].as_str().unwrap_or_default().to_string();
        assert!(text.starts_with("Nice to meet you, !"), "unexpected reply: {text}");
    }

    #[tokio::test]
    async fn get_is_not_routed() {
        let app = app(Ok(json!({}))).await;

        let response = app
            .oneshot(Request::builder().uri(WEBHOOK_PATH).body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
