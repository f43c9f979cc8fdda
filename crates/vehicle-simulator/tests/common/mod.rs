#![allow(dead_code)]

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::Instant;
use vehicle_simulator::{MessageSink, Result, SimulatorError};
use vehicle_types::{Channel, DeviceTopic};

/// 记录下来的一条发布
#[derive(Debug, Clone)]
pub struct Recorded {
    pub topic: String,
    pub payload: serde_json::Value,
    pub at: Duration,
}

impl Recorded {
    pub fn channel(&self) -> Channel {
        DeviceTopic::parse(&self.topic)
            .expect("published to a non-device topic")
            .channel
    }

    pub fn timestamp(&self) -> i64 {
        self.payload["timestamp"].as_i64().expect("missing timestamp")
    }
}

struct RecordingInner {
    started: Instant,
    published: Mutex<Vec<Recorded>>,
    disconnected: AtomicBool,
    publishes_after_disconnect: AtomicUsize,
    fail_after: Option<usize>,
    stalled: bool,
}

/// 内存中的消息出口，记录每次发布及其相对时间
#[derive(Clone)]
pub struct RecordingSink {
    inner: Arc<RecordingInner>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::build(None, false)
    }

    /// 前 `count` 次发布成功，之后全部失败
    pub fn failing_after(count: usize) -> Self {
        Self::build(Some(count), false)
    }

    /// 发布和断开都永远不返回，相当于发送队列已满
    pub fn stalled() -> Self {
        Self::build(None, true)
    }

    fn build(fail_after: Option<usize>, stalled: bool) -> Self {
        Self {
            inner: Arc::new(RecordingInner {
                started: Instant::now(),
                published: Mutex::new(Vec::new()),
                disconnected: AtomicBool::new(false),
                publishes_after_disconnect: AtomicUsize::new(0),
                fail_after,
                stalled,
            }),
        }
    }

    pub fn published(&self) -> Vec<Recorded> {
        self.inner.published.lock().unwrap().clone()
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.published().iter().map(Recorded::channel).collect()
    }

    pub fn is_disconnected(&self) -> bool {
        self.inner.disconnected.load(Ordering::SeqCst)
    }

    pub fn publishes_after_disconnect(&self) -> usize {
        self.inner.publishes_after_disconnect.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn publish(&self, topic: String, payload: Vec<u8>) -> Result<()> {
        if self.inner.stalled {
            std::future::pending::<()>().await;
        }
        let mut published = self.inner.published.lock().unwrap();
        if let Some(limit) = self.inner.fail_after {
            if published.len() >= limit {
                return Err(SimulatorError::sink_closed("recording sink closed"));
            }
        }
        if self.inner.disconnected.load(Ordering::SeqCst) {
            self.inner
                .publishes_after_disconnect
                .fetch_add(1, Ordering::SeqCst);
        }

        published.push(Recorded {
            topic,
            payload: serde_json::from_slice(&payload).expect("payload is not JSON"),
            at: self.inner.started.elapsed(),
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if self.inner.stalled {
            std::future::pending::<()>().await;
        }
        self.inner.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// 假 broker 收到的报文
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerPacket {
    Connect { client_id: String },
    Publish { topic: String, payload: Vec<u8> },
    Disconnect,
}

impl BrokerPacket {
    pub fn as_publish(&self) -> Option<(&str, serde_json::Value)> {
        match self {
            BrokerPacket::Publish { topic, payload } => Some((
                topic.as_str(),
                serde_json::from_slice(payload).expect("payload is not JSON"),
            )),
            _ => None,
        }
    }
}

/// 绑定后立即释放，得到一个当前无人监听的端口
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// 只实现 MQTT 3.1.1 最小子集的测试 broker
pub struct FakeBroker {
    pub addr: SocketAddr,
    pub packets: mpsc::UnboundedReceiver<BrokerPacket>,
}

impl FakeBroker {
    /// `connack_code` 为 0 时接受连接，否则拒绝并关闭连接
    pub async fn start(connack_code: u8) -> FakeBroker {
        Self::start_on(0, connack_code).await
    }

    /// 监听指定端口，`port` 为 0 时由系统分配
    pub async fn start_on(port: u16, connack_code: u8) -> FakeBroker {
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, connack_code, tx).await;
                });
            }
        });

        FakeBroker { addr, packets: rx }
    }

    pub async fn next(&mut self, wait: Duration) -> Option<BrokerPacket> {
        tokio::time::timeout(wait, self.packets.recv())
            .await
            .ok()
            .flatten()
    }

    /// 读取报文直到满足条件，返回途中收到的全部报文（含满足条件的那条）
    pub async fn collect_until<F>(&mut self, wait: Duration, mut done: F) -> Vec<BrokerPacket>
    where
        F: FnMut(&BrokerPacket) -> bool,
    {
        let mut collected = Vec::new();
        while let Some(packet) = self.next(wait).await {
            let finished = done(&packet);
            collected.push(packet);
            if finished {
                break;
            }
        }
        collected
    }
}

async fn serve(
    mut stream: TcpStream,
    connack_code: u8,
    tx: mpsc::UnboundedSender<BrokerPacket>,
) -> std::io::Result<()> {
    loop {
        let mut header = [0u8; 1];
        if stream.read_exact(&mut header).await.is_err() {
            return Ok(());
        }
        let length = read_remaining_length(&mut stream).await?;
        let mut body = vec![0u8; length];
        stream.read_exact(&mut body).await?;

        match header[0] >> 4 {
            1 => {
                let client_id = parse_connect_client_id(&body);
                let _ = tx.send(BrokerPacket::Connect { client_id });
                stream.write_all(&[0x20, 0x02, 0x00, connack_code]).await?;
                if connack_code != 0 {
                    return Ok(());
                }
            }
            3 => {
                let qos = (header[0] >> 1) & 0x03;
                let topic_len = u16::from_be_bytes([body[0], body[1]]) as usize;
                let topic = String::from_utf8_lossy(&body[2..2 + topic_len]).to_string();
                let mut offset = 2 + topic_len;
                if qos > 0 {
                    let packet_id = [body[offset], body[offset + 1]];
                    offset += 2;
                    if qos == 1 {
                        stream
                            .write_all(&[0x40, 0x02, packet_id[0], packet_id[1]])
                            .await?;
                    }
                }
                let payload = body[offset..].to_vec();
                let _ = tx.send(BrokerPacket::Publish { topic, payload });
            }
            12 => {
                stream.write_all(&[0xD0, 0x00]).await?;
            }
            14 => {
                let _ = tx.send(BrokerPacket::Disconnect);
                return Ok(());
            }
            _ => {}
        }
    }
}

async fn read_remaining_length(stream: &mut TcpStream) -> std::io::Result<usize> {
    let mut multiplier = 1usize;
    let mut value = 0usize;
    loop {
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte).await?;
        value += (byte[0] & 0x7F) as usize * multiplier;
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
        multiplier *= 128;
    }
}

fn parse_connect_client_id(body: &[u8]) -> String {
    // 协议名（2 字节长度 + 内容）、协议级别、连接标志、保活时间
    let name_len = u16::from_be_bytes([body[0], body[1]]) as usize;
    let mut offset = 2 + name_len + 1 + 1 + 2;
    let id_len = u16::from_be_bytes([body[offset], body[offset + 1]]) as usize;
    offset += 2;
    String::from_utf8_lossy(&body[offset..offset + id_len]).to_string()
}
