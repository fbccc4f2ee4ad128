#![allow(dead_code)]
use std::sync::Arc;

use rustls::pki_types::PrivateKeyDer;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_rustls::TlsAcceptor;

/// What the mock node does after it has read the probe request.
#[derive(Clone, Copy)]
pub enum SocketPolicy {
    Respond(u16),
    DisconnectAfterRequest,
}

/// Single-connection stand-in for an Elasticsearch node. Records the first
/// request it reads and then follows its [`SocketPolicy`].
pub struct MockEs {
    pub addr: String,
    request: oneshot::Receiver<String>,
}

impl MockEs {
    pub async fn start(policy: SocketPolicy) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let request = read_request(&mut stream).await;
                apply_policy(&mut stream, policy).await;
                let _ = tx.send(request);
            }
        });

        Self { addr, request: rx }
    }

    pub async fn start_tls(policy: SocketPolicy) -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();

        let cert = rcgen::generate_simple_self_signed(vec![
            "localhost".to_string(),
            "127.0.0.1".to_string(),
        ])
        .unwrap();
        let cert_der = cert.cert.der().clone();
        let key = PrivateKeyDer::try_from(cert.signing_key.serialize_der()).unwrap();

        let config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key)
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                if let Ok(mut stream) = acceptor.accept(stream).await {
                    let request = read_request(&mut stream).await;
                    apply_policy(&mut stream, policy).await;
                    let _ = tx.send(request);
                }
            }
        });

        Self { addr, request: rx }
    }

    /// The probe request the mock read, headers included.
    pub async fn take_request(self) -> String {
        self.request.await.unwrap()
    }
}

async fn read_request<S: AsyncRead + Unpin>(stream: &mut S) -> String {
    let mut request: Vec<u8> = Vec::new();
    let mut buf = [0u8; 1024];

    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    String::from_utf8_lossy(&request).into_owned()
}

async fn apply_policy<S: AsyncWrite + Unpin>(stream: &mut S, policy: SocketPolicy) {
    match policy {
        SocketPolicy::Respond(status) => {
            let response = format!("HTTP/1.1 {status} Mock\r\ncontent-length: 0\r\n\r\n");
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.flush().await;
        }
        // Dropping the stream without a response is the disconnect
        SocketPolicy::DisconnectAfterRequest => {}
    }
}
