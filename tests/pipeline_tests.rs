//! End-to-end run: YAML config -> real checkers -> DingTalk sender, with both
//! the monitored service and the robot endpoint stubbed by wiremock.

use serde_json::json;
use server_monitor::config::MonitorConfig;
use server_monitor::notifications::senders::dingtalk::DingTalkSender;
use server_monitor::notifications::{AlertDispatcher, DeliveryStatus};
use server_monitor::runner::Runner;
use server_monitor::service_monitor::ServiceChecker;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn stub_service(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn runner_for(config: &MonitorConfig) -> Runner<ServiceChecker, DingTalkSender> {
    let checker = ServiceChecker::new(Duration::from_secs(2)).unwrap();
    let sender = DingTalkSender::new(config.webhook_url.clone(), Duration::from_secs(2)).unwrap();
    Runner::new(checker, AlertDispatcher::new(sender))
}

#[tokio::test]
async fn test_failed_targets_produce_one_dingtalk_message() {
    let healthy = stub_service("SERVICE OK").await;
    let broken = stub_service("DOWN").await;
    let robot = MockServer::start().await;
    let port = closed_port();

    let yaml = format!(
        r#"
enabled: true
instances:
  http:
    - name: healthy
      url: {healthy}/status
      content_match: OK
    - name: broken
      url: {broken}/status
      content_match: OK
  tcp:
    - name: gone
      host: 127.0.0.1
      port: {port}
ddRobotToken: robot-token
ddRobotUrl: {robot}/robot/send
"#,
        healthy = healthy.uri(),
        broken = broken.uri(),
        robot = robot.uri(),
    );
    let config = MonitorConfig::from_yaml_str(&yaml).unwrap();

    let expected = format!(
        "HTTP -> broken【{}/status】\nresponse content mismatch\nTCP -> gone【127.0.0.1:{port}】\nconnection error\n",
        broken.uri()
    );
    Mock::given(method("POST"))
        .and(path("/robot/send"))
        .and(query_param("access_token", "robot-token"))
        .and(body_json(json!({"msgtype": "text", "text": {"content": expected}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0, "errmsg": "ok"})))
        .expect(1)
        .mount(&robot)
        .await;

    let report = runner_for(&config).run(&config, None).await;
    assert_eq!(report.checked, 3);
    assert_eq!(report.failed, 2);
    assert_eq!(report.delivery, DeliveryStatus::Delivered);
}

#[tokio::test]
async fn test_healthy_run_never_calls_robot() {
    let healthy = stub_service("SERVICE OK").await;
    let robot = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&robot)
        .await;

    let yaml = format!(
        "enabled: true\ninstances:\n  http:\n    - name: healthy\n      url: {}/status\nddRobotToken: t\nddRobotUrl: {}/robot/send\n",
        healthy.uri(),
        robot.uri()
    );
    let config = MonitorConfig::from_yaml_str(&yaml).unwrap();

    let report = runner_for(&config).run(&config, None).await;
    assert_eq!(report.failed, 0);
    assert_eq!(report.delivery, DeliveryStatus::Skipped);
}

#[tokio::test]
async fn test_robot_outage_does_not_fail_the_run() {
    let port = closed_port();
    let robot_port = closed_port();
    let yaml = format!(
        "enabled: true\ninstances:\n  tcp:\n    - {{name: gone, host: 127.0.0.1, port: {port}}}\nddRobotToken: t\nddRobotUrl: http://127.0.0.1:{robot_port}/robot/send\n"
    );
    let config = MonitorConfig::from_yaml_str(&yaml).unwrap();

    let report = runner_for(&config).run(&config, None).await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.delivery, DeliveryStatus::Failed);
}
