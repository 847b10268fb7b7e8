pub fn set_panic_hook() {
    // When the `console_error_panic_hook` feature is enabled, we can call the
    // `set_panic_hook` function at least once during initialization, and then
    // we will get better error messages if our code ever panics.
    //
    // For more details see
    // https://github.com/rustwasm/console_error_panic_hook#readme
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Every counter-API request goes through here so exactly one place knows
/// the base URL. The server identifies the caller for de-duplication from
/// the connection itself; nothing identity-shaped is sent from this side.
pub(crate) async fn hit_counter_api<R: serde::Serialize>(
    method: fetch_happen::Method,
    path: &str,
    body: Option<R>,
) -> Result<fetch_happen::Response, fetch_happen::Error> {
    let client = fetch_happen::Client;
    let url = if cfg!(feature = "local-backend") {
        "http://localhost:3000"
    } else {
        "https://margin-web.fly.dev"
    };

    let request = if matches!(method, fetch_happen::Method::POST) {
        client.post(format!("{url}{path}"))
    } else {
        client.get(format!("{url}{path}"))
    };
    let request = match body {
        Some(body) => request.json(&body)?,
        None => request,
    };

    request.send().await
}
