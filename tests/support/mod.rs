// Boots one user server per test binary on an ephemeral port.
use std::sync::{Arc, OnceLock};
use std::time::Duration;

static SERVER_URL: OnceLock<String> = OnceLock::new();

// Ensure the test server is running and return its base URL.
pub fn ensure_server() -> &'static str {
    SERVER_URL.get_or_init(|| {
        let published = Arc::new(OnceLock::<String>::new());
        let publisher = Arc::clone(&published);

        // A dedicated thread keeps the server alive across `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = publisher.set(format!("http://{addr}"));
                user_server::run(listener).await.expect("server failed");
            });
        });

        wait_until_ready(&published)
    })
}

fn wait_until_ready(published: &OnceLock<String>) -> String {
    let base_url = loop {
        if let Some(url) = published.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return base_url;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}
