//! Request/response boundary: JSON in, validated evaluation, JSON out.

use pacengine::{handle, EngineConfig, EvaluationRequest, EvaluationResponse, Evaluator, Outcome};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use std::time::Duration;

const CORPORATE_PAC: &str = r#"
function FindProxyForURL(url, host) {
    if (isPlainHostName(host) || dnsDomainIs(host, ".corp.example.com"))
        return "DIRECT";
    if (isInNet(myIpAddress(), "10.20.0.0", "255.255.0.0"))
        return "PROXY branch-proxy.example.com:3128; DIRECT";
    return "PROXY proxy1.example.com:8080; PROXY proxy2.example.com:8080";
}
"#;

fn config() -> EngineConfig {
    EngineConfig::default().with_worker(env!("CARGO_BIN_EXE_pacengine"))
}

fn evaluator() -> Evaluator {
    Evaluator::new(config().with_timeout(Duration::from_secs(10)))
}

fn respond(body: serde_json::Value) -> serde_json::Value {
    let request: EvaluationRequest = serde_json::from_value(body).unwrap();
    serde_json::to_value(handle(&evaluator(), &request)).unwrap()
}

#[test]
fn wire_request_round_trip() {
    let response = respond(json!({
        "script": CORPORATE_PAC,
        "destinationHost": "www.example.org",
        "sourceAddress": "10.20.5.6"
    }));
    assert_eq!(
        response,
        json!({
            "outcome": "success",
            "directives": [
                {"type": "PROXY", "hostPort": "branch-proxy.example.com:3128"},
                {"type": "DIRECT"}
            ]
        })
    );
}

#[rstest]
#[case("wiki.corp.example.com", "192.168.1.1", json!([{"type": "DIRECT"}]))]
#[case("localhost", "192.168.1.1", json!([{"type": "DIRECT"}]))]
#[case(
    "www.example.org",
    "192.168.1.1",
    json!([
        {"type": "PROXY", "hostPort": "proxy1.example.com:8080"},
        {"type": "PROXY", "hostPort": "proxy2.example.com:8080"}
    ])
)]
fn corporate_routing(#[case] host: &str, #[case] src: &str, #[case] expected: serde_json::Value) {
    let response = respond(json!({
        "script": CORPORATE_PAC,
        "destinationHost": host,
        "sourceAddress": src
    }));
    assert_eq!(response["outcome"], "success");
    assert_eq!(response["directives"], expected);
}

#[test]
fn destination_url_is_forwarded() {
    let script = r#"
        function FindProxyForURL(url, host) {
            return url.substring(0, 5) === "http:" ? "PROXY plain:80" : "DIRECT";
        }
    "#;
    let response = respond(json!({
        "script": script,
        "destinationHost": "example.com",
        "destinationURL": "http://example.com/index.html",
        "sourceAddress": "10.0.0.1"
    }));
    assert_eq!(response["directives"], json!([{"type": "PROXY", "hostPort": "plain:80"}]));
}

#[rstest]
#[case(json!({"script": "x", "destinationHost": "999.999.999.999", "sourceAddress": "10.0.0.1"}))]
#[case(json!({"script": "x", "destinationHost": "example.com", "sourceAddress": "10.0.0"}))]
#[case(json!({"script": "", "destinationHost": "example.com", "sourceAddress": "10.0.0.1"}))]
#[case(json!({
    "script": "x",
    "destinationHost": "example.com",
    "destinationURL": "::not a url::",
    "sourceAddress": "10.0.0.1"
}))]
fn input_errors(#[case] body: serde_json::Value) {
    let response = respond(body);
    assert_eq!(response["outcome"], "failure");
    assert_eq!(response["error"], "input_validation");
    assert!(response.get("directives").is_none());
}

#[test]
fn script_failures_carry_kind_and_message() {
    let response = respond(json!({
        "script": "function nothing() {}",
        "destinationHost": "example.com",
        "sourceAddress": "10.0.0.1"
    }));
    assert_eq!(
        response,
        json!({
            "outcome": "failure",
            "message": "FindProxyForURL is not defined",
            "error": "missing_entry_point"
        })
    );
}

#[test]
fn timeout_response_is_distinct() {
    let request = EvaluationRequest::new(
        "function FindProxyForURL(url, host) { for (;;) {} }",
        "example.com",
        "10.0.0.1",
    );
    let evaluator = Evaluator::new(config().with_timeout(Duration::from_millis(150)));
    let response: EvaluationResponse = handle(&evaluator, &request);
    assert_eq!(response.outcome, Outcome::Failure);
    assert_eq!(response.error.as_deref(), Some("timeout"));
    assert_eq!(response.message.as_deref(), Some("execution timed out"));
}
