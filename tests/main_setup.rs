use restaurant_api::{AppConfig, config::Env};
use serial_test::serial;
use std::{env, panic};

const CONFIG_VARS: [&str; 14] = [
    "APP_ENV",
    "JWT_SECRET",
    "DB_HOST",
    "DB_PORT",
    "DB_NAME",
    "DB_USER",
    "DB_PASS",
    "DB_MAX_CONNECTIONS",
    "ACCESS_TOKEN_TTL_MINUTES",
    "REFRESH_TOKEN_TTL_DAYS",
    "SERVER_ADDR",
    "BOOTSTRAP_ADMIN_EMAIL",
    "BOOTSTRAP_ADMIN_PASSWORD",
    "BOOTSTRAP_ADMIN_NAME",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with every config variable cleared and `vars` set, then
/// restores the previous environment, re-raising any panic afterwards.
fn run_with_env<T, R>(vars: &[(&str, &str)], test: T) -> std::thread::Result<R>
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    result
}

fn production_vars() -> Vec<(&'static str, &'static str)> {
    vec![
        ("APP_ENV", "production"),
        ("JWT_SECRET", "prod-secret"),
        ("DB_HOST", "db.internal"),
        ("DB_PORT", "6543"),
        ("DB_NAME", "restaurants"),
        ("DB_USER", "svc"),
        ("DB_PASS", "hunter2"),
    ]
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    let config = run_with_env(&[], AppConfig::load).expect("local config must load");

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.database.host, "localhost");
    assert_eq!(config.database.port, 5432);
    assert_eq!(config.database.name, "restaurant");
    assert_eq!(config.server_addr, "0.0.0.0:8005");
    assert_eq!(config.access_token_ttl_minutes, 60);
    assert_eq!(config.refresh_token_ttl_days, 7);
    assert!(!config.jwt_secret.is_empty());
    assert!(config.bootstrap_admin.is_none());
}

#[test]
#[serial]
fn test_app_config_production_loads_all_values() {
    let mut vars = production_vars();
    vars.push(("ACCESS_TOKEN_TTL_MINUTES", "15"));
    vars.push(("SERVER_ADDR", "0.0.0.0:9000"));

    let config = run_with_env(&vars, AppConfig::load).expect("complete config must load");

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.jwt_secret, "prod-secret");
    assert_eq!(config.database.host, "db.internal");
    assert_eq!(config.database.port, 6543);
    assert_eq!(config.database.password, "hunter2");
    assert_eq!(config.access_token_ttl_minutes, 15);
    assert_eq!(config.server_addr, "0.0.0.0:9000");
}

#[test]
#[serial]
fn test_app_config_production_fail_fast_without_jwt_secret() {
    let vars: Vec<_> = production_vars()
        .into_iter()
        .filter(|(key, _)| *key != "JWT_SECRET")
        .collect();

    let result = run_with_env(&vars, AppConfig::load);

    assert!(
        result.is_err(),
        "Production config loading should panic without JWT_SECRET"
    );
}

#[test]
#[serial]
fn test_app_config_production_fail_fast_without_db_password() {
    let vars: Vec<_> = production_vars()
        .into_iter()
        .filter(|(key, _)| *key != "DB_PASS")
        .collect();

    let result = run_with_env(&vars, AppConfig::load);

    assert!(
        result.is_err(),
        "Production config loading should panic without DB_PASS"
    );
}

#[test]
#[serial]
fn test_app_config_rejects_unparsable_numbers() {
    let result = run_with_env(&[("DB_PORT", "not-a-port")], AppConfig::load);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_bootstrap_admin_requires_email_and_password() {
    let only_email = run_with_env(&[("BOOTSTRAP_ADMIN_EMAIL", "root@example.com")], AppConfig::load)
        .expect("config must load");
    assert!(only_email.bootstrap_admin.is_none());

    let both = run_with_env(
        &[
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "changeme"),
        ],
        AppConfig::load,
    )
    .expect("config must load");
    let admin = both.bootstrap_admin.expect("bootstrap admin configured");
    assert_eq!(admin.email, "root@example.com");
    assert_eq!(admin.name, "Administrator");
}

#[test]
#[serial]
fn test_app_config_default_ignores_environment() {
    let config = run_with_env(&production_vars(), AppConfig::default).expect("default never panics");

    assert_eq!(config.env, Env::Local);
    assert_ne!(config.jwt_secret, "prod-secret");
}
