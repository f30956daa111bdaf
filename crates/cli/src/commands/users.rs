use serde_json::json;
use tipbot_core::domain::user::SlackUser;
use tipbot_db::{connect_with_config, SlackUserRepository, SqlSlackUserRepository};

use crate::commands::{prepare, CommandResult, EXIT_DB_CONNECTIVITY, EXIT_QUERY};

pub fn run(team_id: &str) -> CommandResult {
    let (config, runtime) = match prepare("users") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))?;
        let users = SqlSlackUserRepository::new(pool.clone())
            .list_for_team(team_id)
            .await
            .map_err(|error| ("query", error.to_string(), EXIT_QUERY))?;
        pool.close().await;
        Ok::<Vec<SlackUser>, (&'static str, String, u8)>(users)
    });

    match result {
        Ok(users) => CommandResult::success_with_data(
            "users",
            format!("{} known user(s) in team {team_id}", users.len()),
            Some(json!({ "team_id": team_id, "users": users })),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("users", error_class, message, exit_code)
        }
    }
}
