//! Smoke tests against a live server, configured through the environment.

use std::env;

use rsadmin_client::{Client, ClientBuilder};

fn live_client() -> Option<Client> {
    if env::var_os("ADMIN_API_URL").is_none() {
        eprintln!("No server configured, skipping test.");
        return None;
    }
    rsadmin_client::global_init();
    Some(ClientBuilder::from_env().unwrap().build().unwrap())
}

#[test]
fn login_and_logout_round_trip() {
    let Some(mut client) = live_client() else {
        return;
    };
    let username = env::var("ADMIN_API_USER").unwrap();
    let password = env::var("ADMIN_API_PASS").unwrap();

    assert!(client.login(&username, &password), "{}", client.last_error());
    assert!(!client.cookie().is_empty());

    client.logout();
    assert!(client.cookie().is_empty());
}
