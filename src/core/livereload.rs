// src/core/livereload.rs

//! Canal LiveReload: avisa a los navegadores abiertos cuando el bucle de vigilancia reconstruye algo.

use std::net::SocketAddr;
use std::thread;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use serde_json::json;
use tokio::sync::broadcast;

/// Versión del protocolo que anuncian los clientes `livereload.js`.
pub const PROTOCOL: &str = "http://livereload.com/protocols/official-7";

/// Quien recibe los avisos de recarga del bucle de vigilancia.
pub trait ReloadNotifier {
    fn notify(&self, path: &str);
}

pub fn reload_message(path: &str) -> String {
    json!({ "command": "reload", "path": path, "liveCSS": true }).to_string()
}

pub fn hello_message() -> String {
    json!({
        "command": "hello",
        "protocols": [PROTOCOL],
        "serverName": env!("CARGO_PKG_NAME"),
    })
    .to_string()
}

fn is_hello(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|value| value["command"] == "hello")
        .unwrap_or(false)
}

/// Difunde los avisos a todas las sesiones WebSocket abiertas.
#[derive(Clone)]
pub struct LiveReload {
    sender: broadcast::Sender<String>,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReload {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/livereload", get(upgrade))
            .with_state(self.clone())
    }

    /// Abre el puerto en el hilo actual (así un puerto ocupado se detecta aquí)
    /// y atiende las conexiones en un hilo propio.
    pub fn spawn(&self, addr: &str) -> std::io::Result<SocketAddr> {
        let runtime = tokio::runtime::Runtime::new()?;
        let listener = runtime.block_on(tokio::net::TcpListener::bind(addr))?;
        let bound = listener.local_addr()?;
        let app = self.router();

        thread::spawn(move || {
            if let Err(e) = runtime.block_on(async move { axum::serve(listener, app).await }) {
                log::error!("El servidor LiveReload se detuvo: {}", e);
            }
        });
        Ok(bound)
    }
}

impl ReloadNotifier for LiveReload {
    fn notify(&self, path: &str) {
        match self.sender.send(reload_message(path)) {
            Ok(clients) => log::debug!("Recarga de '{}' enviada a {} cliente(s)", path, clients),
            Err(_) => log::debug!("Recarga de '{}' sin clientes conectados", path),
        }
    }
}

async fn upgrade(ws: WebSocketUpgrade, State(reload): State<LiveReload>) -> Response {
    // Suscribirse antes de responder: ningún aviso posterior al 101 se pierde.
    let reloads = reload.subscribe();
    ws.on_upgrade(move |socket| session(socket, reloads))
}

enum Event {
    Incoming(Option<Result<Message, axum::Error>>),
    Reload(Result<String, broadcast::error::RecvError>),
}

async fn session(mut socket: WebSocket, mut reloads: broadcast::Receiver<String>) {
    loop {
        let event = tokio::select! {
            incoming = socket.recv() => Event::Incoming(incoming),
            reload = reloads.recv() => Event::Reload(reload),
        };

        let reply = match event {
            Event::Incoming(Some(Ok(Message::Text(text)))) if is_hello(&text) => hello_message(),
            Event::Incoming(Some(Ok(Message::Close(_)))) | Event::Incoming(None) => break,
            Event::Incoming(Some(Err(e))) => {
                log::debug!("Sesión LiveReload cerrada: {}", e);
                break;
            }
            Event::Incoming(_) => continue,
            Event::Reload(Ok(message)) => message,
            Event::Reload(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                log::warn!("Un cliente LiveReload perdió {} aviso(s)", skipped);
                continue;
            }
            Event::Reload(Err(broadcast::error::RecvError::Closed)) => break,
        };

        if socket.send(Message::Text(reply)).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Duration;

    #[test]
    fn notify_reaches_subscribers() {
        let reload = LiveReload::new();
        let mut client = reload.subscribe();
        reload.notify("src/app/a.less");

        let message: serde_json::Value = serde_json::from_str(&client.try_recv().unwrap()).unwrap();
        assert_eq!(message["command"], "reload");
        assert_eq!(message["path"], "src/app/a.less");
    }

    #[test]
    fn notify_without_clients_is_fine() {
        LiveReload::new().notify("src/app/a.js");
    }

    #[test]
    fn hello_is_answered_with_the_protocol() {
        assert!(is_hello(r#"{"command":"hello","protocols":[]}"#));
        assert!(!is_hello(r#"{"command":"info"}"#));
        assert!(!is_hello("no es json"));

        let hello: serde_json::Value = serde_json::from_str(&hello_message()).unwrap();
        assert_eq!(hello["protocols"][0], PROTOCOL);
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn websocket_client_receives_reload() {
        let reload = LiveReload::new();
        let addr = reload.spawn("127.0.0.1:0").unwrap();

        let mut stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        stream
            .write_all(
                b"GET /livereload HTTP/1.1\r\n\
                  Host: localhost\r\n\
                  Connection: Upgrade\r\n\
                  Upgrade: websocket\r\n\
                  Sec-WebSocket-Version: 13\r\n\
                  Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n",
            )
            .unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 512];
        let header_end = loop {
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "conexión cerrada antes de la respuesta");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
        };
        assert!(String::from_utf8_lossy(&buf[..header_end]).starts_with("HTTP/1.1 101"));

        reload.notify("src/app/a.less");

        let mut frame = buf[header_end..].to_vec();
        while frame.len() < 2 || frame.len() < 2 + (frame[1] & 0x7f) as usize {
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "conexión cerrada antes del aviso");
            frame.extend_from_slice(&chunk[..n]);
        }
        // Trama de texto final, sin máscara y con longitud corta.
        assert_eq!(frame[0], 0x81);
        let len = (frame[1] & 0x7f) as usize;
        let message: serde_json::Value = serde_json::from_slice(&frame[2..2 + len]).unwrap();
        assert_eq!(message["command"], "reload");
        assert_eq!(message["path"], "src/app/a.less");
    }
}
