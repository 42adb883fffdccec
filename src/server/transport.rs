//! Datagram Transport
//!
//! The boundary between node logic and the network. A node owns exactly one
//! socket; the handshake, the event loop and every registration task send
//! through it. Datagram sends are atomic per call, so concurrent senders
//! need no extra locking.

use crate::error::Result;
use crate::protocol::{Message, MessageCodec};
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// A connectionless message transport
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    /// Send one datagram to `target`
    async fn send_to(&self, payload: &[u8], target: SocketAddr) -> Result<usize>;

    /// Receive one datagram into `buf`
    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)>;

    /// Address this transport is bound to
    fn local_addr(&self) -> Result<SocketAddr>;
}

#[async_trait]
impl DatagramTransport for UdpSocket {
    async fn send_to(&self, payload: &[u8], target: SocketAddr) -> Result<usize> {
        Ok(UdpSocket::send_to(self, payload, target).await?)
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        Ok(UdpSocket::recv_from(self, buf).await?)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(UdpSocket::local_addr(self)?)
    }
}

/// Encode `message` and send it to `target`
pub async fn send_message<T>(transport: &T, message: &Message, target: SocketAddr) -> Result<()>
where
    T: DatagramTransport + ?Sized,
{
    let payload = MessageCodec::encode(message)?;
    transport.send_to(&payload, target).await?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_message_over_udp() {
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = DatagramTransport::local_addr(&receiver).unwrap();

        send_message(&sender, &Message::query("com"), target)
            .await
            .unwrap();

        let mut buf = [0u8; 1024];
        let (len, from) = DatagramTransport::recv_from(&receiver, &mut buf).await.unwrap();
        assert_eq!(from, DatagramTransport::local_addr(&sender).unwrap());
        assert_eq!(MessageCodec::decode(&buf[..len]).unwrap(), Message::query("com"));
    }
}
