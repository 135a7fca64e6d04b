use std::env;

use clickhouse::Client;

fn read_env_var(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Build the shared ClickHouse client plus the database the schema is read
/// from. Returns `None` if any of the four variables is unset; the caller
/// decides whether that is fatal.
pub fn try_get_client() -> Option<(Client, String)> {
    let url = read_env_var("CLICKHOUSE_URL")?;
    let user = read_env_var("CLICKHOUSE_USER")?;
    let password = read_env_var("CLICKHOUSE_PASSWORD")?;
    let database = read_env_var("CLICKHOUSE_DATABASE")?;

    let client = Client::default()
        .with_url(url)
        .with_user(user)
        .with_password(password)
        .with_database(database.clone());

    Some((client, database))
}
