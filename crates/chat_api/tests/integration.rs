use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use chat_api::{ChatApiClient, ChatApiConfig, ChatApiError, ChatRequest};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

fn allow_local_integration() -> bool {
    std::env::var("CHAT_API_ALLOW_LOCAL_INTEGRATION")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

#[derive(Clone)]
struct ScriptedResponse {
    status: u16,
    delay_ms: u64,
    body: String,
}

struct ScriptedServer {
    base_url: String,
    request_count: Arc<AtomicUsize>,
    request_heads: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let scripts = Arc::new(scripts);
        let request_count = Arc::new(AtomicUsize::new(0));
        let request_heads = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}/v1");

        let handle = tokio::spawn({
            let scripts = Arc::clone(&scripts);
            let request_count = Arc::clone(&request_count);
            let request_heads = Arc::clone(&request_heads);

            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let scripts = Arc::clone(&scripts);
                    let request_count = Arc::clone(&request_count);
                    let request_heads = Arc::clone(&request_heads);
                    tokio::spawn(async move {
                        serve_one(socket, scripts, request_count, request_heads).await;
                    });
                }
            }
        });

        Self {
            base_url,
            request_count,
            request_heads,
            handle,
        }
    }

    fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Acquire)
    }

    fn request_heads(&self) -> Vec<String> {
        match self.request_heads.lock() {
            Ok(heads) => heads.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

fn respond(status: u16, body: &str) -> ScriptedResponse {
    ScriptedResponse {
        status,
        delay_ms: 0,
        body: body.to_string(),
    }
}

fn respond_after(delay_ms: u64, status: u16, body: &str) -> ScriptedResponse {
    ScriptedResponse {
        status,
        delay_ms,
        body: body.to_string(),
    }
}

fn client_for(server: &ScriptedServer) -> ChatApiClient {
    ChatApiClient::new(ChatApiConfig::new(&server.base_url)).expect("client")
}

#[tokio::test]
async fn list_models_returns_catalog_and_sends_api_key() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![respond(
        200,
        r#"[{"model":"gpt-x","pricing":{"input":0.5,"output":1.5,"units":"per 1M tokens"}}]"#,
    )])
    .await;

    let models = client_for(&server)
        .list_models("validkey", None)
        .await
        .expect("catalog should load");

    assert_eq!(models.len(), 1);
    assert_eq!(models[0].model, "gpt-x");
    assert_eq!(server.request_count(), 1);

    let heads = server.request_heads();
    let head = heads[0].to_ascii_lowercase();
    assert!(head.starts_with("get /v1/models "));
    assert!(head.contains("api-key: validkey"));

    server.shutdown();
}

#[tokio::test]
async fn list_models_surfaces_unauthorized_status() {
    if !allow_local_integration() {
        return;
    }

    let server =
        ScriptedServer::new(vec![respond(401, r#"{"error":{"message":"bad key"}}"#)]).await;

    let error = client_for(&server)
        .list_models("expired", None)
        .await
        .expect_err("401 must fail");

    assert!(error.is_unauthorized());
    assert!(error.to_string().contains("bad key"));
    assert_eq!(server.request_count(), 1);

    server.shutdown();
}

#[tokio::test]
async fn chat_returns_reply_content() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![respond(200, r#"{"content":"A qubit is..."}"#)]).await;

    let reply = client_for(&server)
        .chat("validkey", &ChatRequest::new("What is a qubit?", "gpt-x"), None)
        .await
        .expect("chat should succeed");

    assert_eq!(reply.content, "A qubit is...");
    assert!(server.request_heads()[0]
        .to_ascii_lowercase()
        .starts_with("post /v1/chat "));

    server.shutdown();
}

#[tokio::test]
async fn chat_does_not_retry_server_errors() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![
        respond(503, ""),
        respond(200, r#"{"content":"late"}"#),
    ])
    .await;

    let error = client_for(&server)
        .chat("validkey", &ChatRequest::new("hi", "gpt-x"), None)
        .await
        .expect_err("503 must fail");

    assert!(matches!(error, ChatApiError::Status(status, _) if status.as_u16() == 503));
    assert_eq!(server.request_count(), 1);

    server.shutdown();
}

#[tokio::test]
async fn chat_reports_malformed_success_body() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![respond(200, "<html>oops</html>")]).await;

    let error = client_for(&server)
        .chat("validkey", &ChatRequest::new("hi", "gpt-x"), None)
        .await
        .expect_err("non-json body must fail");

    assert!(matches!(error, ChatApiError::MalformedBody { endpoint: "chat", .. }));

    server.shutdown();
}

#[tokio::test]
async fn chat_cancellation_interrupts_slow_response() {
    if !allow_local_integration() {
        return;
    }

    let server =
        ScriptedServer::new(vec![respond_after(5_000, 200, r#"{"content":"too late"}"#)]).await;
    let client = client_for(&server);
    let cancel = Arc::new(AtomicBool::new(false));

    let canceller = {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            cancel.store(true, Ordering::Release);
        })
    };

    let request = ChatRequest::new("hi", "gpt-x");
    let error = timeout(
        Duration::from_secs(2),
        client.chat("validkey", &request, Some(&cancel)),
    )
    .await
    .expect("cancellation should resolve promptly")
    .expect_err("cancelled request must fail");

    assert!(matches!(error, ChatApiError::Cancelled));
    let _ = canceller.await;

    server.shutdown();
}

#[tokio::test]
async fn chat_timeout_fails_hung_request() {
    if !allow_local_integration() {
        return;
    }

    let server =
        ScriptedServer::new(vec![respond_after(5_000, 200, r#"{"content":"too late"}"#)]).await;
    let client = ChatApiClient::new(
        ChatApiConfig::new(&server.base_url).with_timeout(Duration::from_millis(100)),
    )
    .expect("client");

    let error = timeout(
        Duration::from_secs(2),
        client.chat("validkey", &ChatRequest::new("hi", "gpt-x"), None),
    )
    .await
    .expect("timeout should resolve promptly")
    .expect_err("hung request must fail");

    assert!(error.is_timeout());

    server.shutdown();
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

async fn serve_one(
    mut socket: TcpStream,
    scripts: Arc<Vec<ScriptedResponse>>,
    request_count: Arc<AtomicUsize>,
    request_heads: Arc<Mutex<Vec<String>>>,
) {
    let head = match read_request_head(&mut socket).await {
        Ok(head) => head,
        Err(_) => return,
    };
    match request_heads.lock() {
        Ok(mut heads) => heads.push(head),
        Err(poisoned) => poisoned.into_inner().push(head),
    }

    let index = request_count.fetch_add(1, Ordering::AcqRel);
    let response = scripts
        .get(index)
        .cloned()
        .unwrap_or_else(|| respond(500, r#"{"error":{"message":"unexpected request"}}"#));

    if response.delay_ms > 0 {
        sleep(Duration::from_millis(response.delay_ms)).await;
    }

    let payload = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        status_reason(response.status),
        response.body.len(),
        response.body,
    );

    let _ = socket.write_all(payload.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request_head(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];

    loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
        if request.windows(4).any(|window| window == b"\r\n\r\n") {
            break;
        }
    }

    let text = String::from_utf8_lossy(&request);
    let head = text.split("\r\n\r\n").next().unwrap_or_default();
    Ok(head.to_string())
}
