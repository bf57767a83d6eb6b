//! Bridge calls against a local HTTP backend

use ccbridge_core::codec::{decode_response, encode_parameters, RESPONSE_SIZE};
use ccbridge_core::{last_error, Bridge, Error, RequestConfig, TransportLibrary, WriteOutcome};
use mockito::Matcher;

const ENDPOINT: &str = "/api/index.php";

fn config_for(base_url: String) -> RequestConfig {
    RequestConfig {
        base_url,
        ..RequestConfig::default()
    }
}

fn dialer_input(control: Option<&str>) -> Vec<u8> {
    let mut pairs = vec![("tel", "0744516456"), ("CIF", "1234KTE")];
    if let Some(value) = control {
        pairs.push(("CFResp", value));
    }
    encode_parameters(pairs).unwrap()
}

#[test]
fn test_echo_round_trip() {
    let mut server = mockito::Server::new();
    let backend = server
        .mock("GET", ENDPOINT)
        .match_query(Matcher::Exact("CIF=1234KTE&tel=0744516456".into()))
        .with_status(200)
        .with_body("Success! Processed request for tel=0744516456")
        .create();

    let library = TransportLibrary::new();
    library.init().unwrap();

    let config = config_for(format!("{}{}", server.url(), ENDPOINT));
    let transport = library.transport(&config.transport_settings()).unwrap();
    let bridge = Bridge::new(config, transport);

    let mut out = [0u8; RESPONSE_SIZE];
    let outcome = bridge
        .process(&dialer_input(Some("yes")), Some(&mut out))
        .unwrap();

    backend.assert();
    assert_eq!(outcome.status, 200);
    assert_eq!(outcome.parameters, 3);

    let (key, value) = decode_response(&out).unwrap().unwrap();
    assert_eq!(key, "CFResp");
    assert_eq!(value, "Success! Processed request for tel=0744516456");

    library.shutdown();
}

#[test]
fn test_long_body_is_truncated() {
    let mut server = mockito::Server::new();
    let body = "x".repeat(300);
    let _backend = server
        .mock("GET", ENDPOINT)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(&body)
        .create();

    let library = TransportLibrary::new();
    library.init().unwrap();
    let config = config_for(format!("{}{}", server.url(), ENDPOINT));
    let bridge = Bridge::new(config.clone(), library.transport(&config.transport_settings()).unwrap());

    let mut out = [0xffu8; 200];
    let outcome = bridge
        .process(&dialer_input(Some("yes")), Some(&mut out))
        .unwrap();
    assert_eq!(outcome.response, WriteOutcome::Written { value_len: 127 });

    let (_, value) = decode_response(&out).unwrap().unwrap();
    assert_eq!(value.len(), 127);
    // Bytes past the response record are left alone.
    assert!(out[RESPONSE_SIZE..].iter().all(|&b| b == 0xff));

    library.shutdown();
}

#[test]
fn test_not_found_fails_call() {
    let mut server = mockito::Server::new();
    let _backend = server
        .mock("GET", ENDPOINT)
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body("Error: Unknown endpoint")
        .create();

    let library = TransportLibrary::new();
    library.init().unwrap();
    let config = config_for(format!("{}{}", server.url(), ENDPOINT));
    let bridge = Bridge::new(config.clone(), library.transport(&config.transport_settings()).unwrap());

    let mut out = [0u8; RESPONSE_SIZE];
    assert_eq!(bridge.call(&dialer_input(Some("yes")), Some(&mut out)), 1);

    let message = last_error::message().unwrap();
    assert!(message.starts_with("REQUEST_FAILED"));
    assert!(message.contains("404"));
    assert!(out.iter().all(|&b| b == 0));

    library.shutdown();
}

#[test]
fn test_no_echo_without_control_parameter() {
    let mut server = mockito::Server::new();
    let backend = server
        .mock("GET", ENDPOINT)
        .match_query(Matcher::Exact("CIF=1234KTE&tel=0744516456".into()))
        .with_status(200)
        .with_body("Success!")
        .create();

    let library = TransportLibrary::new();
    library.init().unwrap();
    let config = config_for(format!("{}{}", server.url(), ENDPOINT));
    let bridge = Bridge::new(config.clone(), library.transport(&config.transport_settings()).unwrap());

    let mut out = [0u8; RESPONSE_SIZE];
    assert_eq!(bridge.call(&dialer_input(None), Some(&mut out)), 0);
    assert_eq!(last_error::message(), None);
    assert!(out.iter().all(|&b| b == 0));
    backend.assert();

    library.shutdown();
}

#[test]
fn test_redirect_is_followed() {
    let mut server = mockito::Server::new();
    let target = format!("{}{}", server.url(), ENDPOINT);
    let _moved = server
        .mock("GET", "/old")
        .match_query(Matcher::Any)
        .with_status(302)
        .with_header("location", &target)
        .create();
    let landed = server
        .mock("GET", ENDPOINT)
        .with_status(200)
        .with_body("moved here")
        .create();

    let library = TransportLibrary::new();
    library.init().unwrap();
    let config = config_for(format!("{}/old", server.url()));
    let bridge = Bridge::new(config.clone(), library.transport(&config.transport_settings()).unwrap());

    let mut out = [0u8; RESPONSE_SIZE];
    bridge
        .process(&dialer_input(Some("yes")), Some(&mut out))
        .unwrap();
    landed.assert();

    let (_, value) = decode_response(&out).unwrap().unwrap();
    assert_eq!(value, "moved here");

    library.shutdown();
}

/// Mount `/hop1` .. `/hop{hops}`, each redirecting to the next, the last to `ENDPOINT`
fn redirect_chain(server: &mut mockito::ServerGuard, hops: usize) -> Vec<mockito::Mock> {
    (1..=hops)
        .map(|hop| {
            let next = if hop == hops {
                format!("{}{}", server.url(), ENDPOINT)
            } else {
                format!("{}/hop{}", server.url(), hop + 1)
            };
            server
                .mock("GET", format!("/hop{}", hop).as_str())
                .match_query(Matcher::Any)
                .with_status(302)
                .with_header("location", &next)
                .create()
        })
        .collect()
}

#[test]
fn test_three_redirects_are_followed() {
    let mut server = mockito::Server::new();
    let _chain = redirect_chain(&mut server, 3);
    let landed = server
        .mock("GET", ENDPOINT)
        .with_status(200)
        .with_body("after three hops")
        .create();

    let library = TransportLibrary::new();
    library.init().unwrap();
    let config = config_for(format!("{}/hop1", server.url()));
    let bridge = Bridge::new(config.clone(), library.transport(&config.transport_settings()).unwrap());

    let mut out = [0u8; RESPONSE_SIZE];
    bridge
        .process(&dialer_input(Some("yes")), Some(&mut out))
        .unwrap();
    landed.assert();

    library.shutdown();
}

#[test]
fn test_fourth_redirect_fails_call() {
    let mut server = mockito::Server::new();
    let _chain = redirect_chain(&mut server, 4);
    let never = server.mock("GET", ENDPOINT).with_status(200).expect(0).create();

    let library = TransportLibrary::new();
    library.init().unwrap();
    let config = config_for(format!("{}/hop1", server.url()));
    let bridge = Bridge::new(config.clone(), library.transport(&config.transport_settings()).unwrap());

    let mut out = [0u8; RESPONSE_SIZE];
    let err = bridge
        .process(&dialer_input(Some("yes")), Some(&mut out))
        .unwrap_err();
    assert!(matches!(err, Error::RequestFailed(_)));
    assert!(err.to_string().contains("too many redirects"), "{}", err);
    assert!(out.iter().all(|&b| b == 0));
    never.assert();

    library.shutdown();
}

#[test]
fn test_silent_backend_times_out() {
    // Connections queue in the backlog and are never answered.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let library = TransportLibrary::new();
    library.init().unwrap();
    let config = RequestConfig {
        timeout: 1,
        connect_timeout: 1,
        ..config_for(format!("http://127.0.0.1:{}{}", port, ENDPOINT))
    };
    let bridge = Bridge::new(config.clone(), library.transport(&config.transport_settings()).unwrap());

    let started = std::time::Instant::now();
    let err = bridge.process(&dialer_input(None), None).unwrap_err();
    assert!(matches!(err, Error::RequestFailed(_)));
    assert!(err.to_string().contains("timed out"), "{}", err);
    assert!(started.elapsed() < std::time::Duration::from_secs(10));

    drop(listener);
    library.shutdown();
}

#[test]
fn test_connection_refused() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let library = TransportLibrary::new();
    library.init().unwrap();
    let config = config_for(format!("http://127.0.0.1:{}{}", port, ENDPOINT));
    let bridge = Bridge::new(config.clone(), library.transport(&config.transport_settings()).unwrap());

    let err = bridge.process(&dialer_input(Some("yes")), None).unwrap_err();
    assert!(matches!(err, Error::RequestFailed(_)));
    assert!(err.is_transport());

    library.shutdown();
}

#[test]
fn test_shutdown_invalidates_library_transports() {
    let library = TransportLibrary::new();
    library.init().unwrap();
    library.shutdown();

    let err = library
        .transport(&RequestConfig::default().transport_settings())
        .err()
        .unwrap();
    assert_eq!(err.kind(), "TRANSPORT_INIT_FAILED");
}
