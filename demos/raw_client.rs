use statline::StatlineClient;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
pub async fn main() {
    let client = StatlineClient::from_connection_string(
        "statsd://0.0.0.0:8125?application=statline.demo&environment=dev",
    );
    loop {
        client
            .incr("demo.heartbeat")
            .expect("Failed to emit metric!");
        println!("Emitted metric!");
        client
            .time_future(
                "demo.sleep",
                1.0,
                tokio::time::sleep(tokio::time::Duration::from_millis(3000)),
            )
            .await;
    }
}
