use crate::rendering::render;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use shared::ServerMessage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// Builds the WebSocket address for joining `hub` as `name`
pub fn join_url(server: &str, hub: &str, name: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        &format!("ws://{}/ws", server),
        &[("hub", hub), ("name", name)],
    )
}

pub struct Client {
    url: Url,
}

impl Client {
    pub fn new(server: &str, hub: &str, name: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Client {
            url: join_url(server, hub, name)?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Plays until the server closes the connection or stdin ends
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (socket, _) = connect_async(self.url.as_str()).await?;
        info!("Connected to {}", self.url);
        println!("Type a whole number between 0 and 100 and press Enter.");

        let (mut sink, mut stream) = socket.split();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            let guess = line.trim();
                            if guess.is_empty() {
                                continue;
                            }
                            sink.send(Message::text(guess.to_string())).await?;
                        }
                        None => {
                            info!("Input closed, leaving the hub");
                            let _ = sink.close().await;
                            break;
                        }
                    }
                }

                message = stream.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()),
                        Some(Ok(Message::Close(frame))) => {
                            info!("Server closed the connection: {:?}", frame);
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Connection error: {}", e);
                            break;
                        }
                        None => {
                            info!("Connection closed");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_text(&self, text: &str) {
        match ServerMessage::from_json(text) {
            Ok(message) => {
                debug!("Received {:?}", message);
                println!("{}", render(&message));
            }
            Err(e) => warn!("Unreadable message from server: {}", e),
        }
    }
}
