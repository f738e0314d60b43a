//! Local SOCKS5 relay
//!
//! Minimal RFC 1928 server: no authentication, `CONNECT` only. In
//! `protocol=all` mode cloudflared forwards the proxy hostname to this
//! listener.

use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, copy_bidirectional};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const SOCKS_VERSION: u8 = 0x05;
const NO_AUTH: u8 = 0x00;
const NO_ACCEPTABLE_METHOD: u8 = 0xFF;
const CMD_CONNECT: u8 = 0x01;

const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

const REPLY_SUCCEEDED: u8 = 0x00;
const REPLY_HOST_UNREACHABLE: u8 = 0x04;
const REPLY_CONNECTION_REFUSED: u8 = 0x05;
const REPLY_COMMAND_NOT_SUPPORTED: u8 = 0x07;
const REPLY_ADDRESS_TYPE_NOT_SUPPORTED: u8 = 0x08;

/// Accept clients until `cancel` fires
pub async fn serve(listener: TcpListener, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("SOCKS5 relay stopped");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = cancel.cancelled() => {}
                            result = handle_client(stream) => {
                                if let Err(e) = result {
                                    debug!("SOCKS5 client {} failed: {}", peer, e);
                                }
                            }
                        }
                    });
                }
                Err(e) => {
                    warn!("SOCKS5 relay accept error: {}", e);
                    break;
                }
            }
        }
    }
}

async fn handle_client(mut stream: TcpStream) -> std::io::Result<()> {
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).await?;
    if header[0] != SOCKS_VERSION {
        return Ok(());
    }

    let mut methods = vec![0u8; header[1] as usize];
    stream.read_exact(&mut methods).await?;
    if !methods.contains(&NO_AUTH) {
        stream.write_all(&[SOCKS_VERSION, NO_ACCEPTABLE_METHOD]).await?;
        return Ok(());
    }
    stream.write_all(&[SOCKS_VERSION, NO_AUTH]).await?;

    let mut request = [0u8; 4];
    stream.read_exact(&mut request).await?;
    if request[0] != SOCKS_VERSION || request[1] != CMD_CONNECT {
        send_reply(&mut stream, REPLY_COMMAND_NOT_SUPPORTED).await?;
        return Ok(());
    }

    let host = match request[3] {
        ATYP_IPV4 => {
            let mut addr = [0u8; 4];
            stream.read_exact(&mut addr).await?;
            Ipv4Addr::from(addr).to_string()
        }
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await?;
            let mut name = vec![0u8; len[0] as usize];
            stream.read_exact(&mut name).await?;
            String::from_utf8_lossy(&name).into_owned()
        }
        ATYP_IPV6 => {
            let mut addr = [0u8; 16];
            stream.read_exact(&mut addr).await?;
            Ipv6Addr::from(addr).to_string()
        }
        _ => {
            send_reply(&mut stream, REPLY_ADDRESS_TYPE_NOT_SUPPORTED).await?;
            return Ok(());
        }
    };

    let mut port = [0u8; 2];
    stream.read_exact(&mut port).await?;
    let port = u16::from_be_bytes(port);

    let mut target = match TcpStream::connect((host.as_str(), port)).await {
        Ok(target) => target,
        Err(e) => {
            debug!("SOCKS5 target {}:{} unreachable: {}", host, port, e);
            let code = if e.kind() == std::io::ErrorKind::ConnectionRefused {
                REPLY_CONNECTION_REFUSED
            } else {
                REPLY_HOST_UNREACHABLE
            };
            send_reply(&mut stream, code).await?;
            return Ok(());
        }
    };

    send_reply(&mut stream, REPLY_SUCCEEDED).await?;
    copy_bidirectional(&mut stream, &mut target).await?;
    Ok(())
}

async fn send_reply<W>(stream: &mut W, status: u8) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    // BND.ADDR is always reported as 0.0.0.0:0
    let reply = [SOCKS_VERSION, status, 0x00, ATYP_IPV4, 0, 0, 0, 0, 0, 0];
    stream.write_all(&reply).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;

    async fn start_relay() -> (SocketAddr, CancellationToken, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(serve(listener, cancel.clone()));
        (addr, cancel, handle)
    }

    async fn start_echo() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let (mut r, mut w) = stream.split();
                    let _ = tokio::io::copy(&mut r, &mut w).await;
                });
            }
        });
        addr
    }

    async fn greet(client: &mut TcpStream) {
        client.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
        let mut choice = [0u8; 2];
        client.read_exact(&mut choice).await.unwrap();
        assert_eq!(choice, [0x05, 0x00]);
    }

    #[tokio::test]
    async fn test_connect_relays_bytes() {
        let (relay, cancel, handle) = start_relay().await;
        let echo = start_echo().await;

        let mut client = TcpStream::connect(relay).await.unwrap();
        greet(&mut client).await;

        let mut request = vec![0x05, CMD_CONNECT, 0x00, ATYP_IPV4, 127, 0, 0, 1];
        request.extend_from_slice(&echo.port().to_be_bytes());
        client.write_all(&request).await.unwrap();

        let mut reply = [0u8; 10];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[1], REPLY_SUCCEEDED);

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_domain_target() {
        let (relay, cancel, _handle) = start_relay().await;
        let echo = start_echo().await;

        let mut client = TcpStream::connect(relay).await.unwrap();
        greet(&mut client).await;

        let host = b"localhost";
        let mut request = vec![0x05, CMD_CONNECT, 0x00, ATYP_DOMAIN, host.len() as u8];
        request.extend_from_slice(host);
        request.extend_from_slice(&echo.port().to_be_bytes());
        client.write_all(&request).await.unwrap();

        let mut reply = [0u8; 10];
        client.read_exact(&mut reply).await.unwrap();
        // localhost may resolve to ::1 first where nothing listens
        assert!(reply[1] == REPLY_SUCCEEDED || reply[1] == REPLY_CONNECTION_REFUSED);

        cancel.cancel();
    }

    #[tokio::test]
    async fn test_bind_command_not_supported() {
        let (relay, cancel, _handle) = start_relay().await;

        let mut client = TcpStream::connect(relay).await.unwrap();
        greet(&mut client).await;
        client
            .write_all(&[0x05, 0x02, 0x00, ATYP_IPV4, 127, 0, 0, 1, 0, 80])
            .await
            .unwrap();

        let mut reply = [0u8; 10];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[1], REPLY_COMMAND_NOT_SUPPORTED);

        cancel.cancel();
    }

    #[tokio::test]
    async fn test_auth_required_clients_rejected() {
        let (relay, cancel, _handle) = start_relay().await;

        let mut client = TcpStream::connect(relay).await.unwrap();
        // username/password only
        client.write_all(&[0x05, 0x01, 0x02]).await.unwrap();
        let mut choice = [0u8; 2];
        client.read_exact(&mut choice).await.unwrap();
        assert_eq!(choice, [0x05, NO_ACCEPTABLE_METHOD]);

        cancel.cancel();
    }

    #[tokio::test]
    async fn test_cancel_closes_listener() {
        let (relay, cancel, handle) = start_relay().await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(TcpStream::connect(relay).await.is_err());
    }
}
