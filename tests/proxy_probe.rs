//! Integration tests for the HTTP proxy probe.
//!
//! A throwaway TCP listener plays the proxy: reqwest sends plain-HTTP requests
//! to it in absolute form, so no real upstream is involved.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use download_config::proxy::check_proxies;
use download_config::{HttpProbe, ProbeError, Proxies, ProxyProbe};
use serde_json::json;

const PROBE_TARGET: &str = "http://probe.invalid/";

/// Serves one connection with `status_line`, returning the proxy URL.
fn one_shot_proxy(status_line: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");

    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let mut seen = Vec::new();
            while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => seen.extend_from_slice(&buf[..n]),
                }
            }
            let response =
                format!("{status_line}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");
            let _ = stream.write_all(response.as_bytes());
        }
    });

    format!("http://{addr}")
}

/// A local port nobody listens on.
fn closed_port_proxy() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}

#[test]
fn test_reachable_proxy_yields_three_scheme_mapping() {
    // Arrange
    let proxy = one_shot_proxy("HTTP/1.1 200 OK");
    let probe = HttpProbe::new(PROBE_TARGET, Duration::from_secs(5));

    // Act
    let checked = check_proxies(&json!(proxy), &probe);

    // Assert
    assert_eq!(checked.value, Proxies::all(&proxy));
    assert_eq!(checked.value.http.as_deref(), Some(proxy.as_str()));
    assert_eq!(checked.value.https.as_deref(), Some(proxy.as_str()));
    assert_eq!(checked.value.ftp.as_deref(), Some(proxy.as_str()));
    assert!(!checked.is_warning());
}

#[test]
fn test_connection_error_disables_proxy() {
    // Arrange
    let proxy = closed_port_proxy();
    let probe = HttpProbe::new(PROBE_TARGET, Duration::from_secs(5));

    // Act
    let checked = check_proxies(&json!(proxy), &probe);

    // Assert
    assert_eq!(checked.value, Proxies::disabled());
    assert_eq!(checked.value.http, None);
    assert_eq!(checked.value.https, None);
    assert_eq!(checked.value.ftp, None);
    assert!(checked.is_warning());
}

#[test]
fn test_non_ok_status_is_reported() {
    let proxy = one_shot_proxy("HTTP/1.1 407 Proxy Authentication Required");
    let probe = HttpProbe::new(PROBE_TARGET, Duration::from_secs(5));

    let result = probe.probe(&Proxies::all(&proxy));

    match result {
        Err(ProbeError::Status(status)) => assert_eq!(status.as_u16(), 407),
        other => panic!("expected a status error, got {other:?}"),
    }
}
