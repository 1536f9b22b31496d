use std::{
    collections::HashMap,
    io::ErrorKind,
    net::{Ipv4Addr, SocketAddrV4, UdpSocket},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{bail, Context};
use socket2::{Domain, Protocol, Socket, Type};

use crate::{
    framing::{decode_frame, encode_frame},
    messages::{DataType, Envelope, TimeStamp},
};

pub const OD4_PORT: u16 = 12175;
const MAX_DATAGRAM: usize = 65_535;
const RECEIVE_TIMEOUT: Duration = Duration::from_millis(100);

type Callback = Box<dyn Fn(&Envelope) + Send>;
type Triggers = Arc<Mutex<HashMap<i32, Callback>>>;

/// Conference on the multicast group 225.0.0.<cid>. Sending works right
/// away; the receiver thread starts with the first registered trigger.
pub struct Od4Session {
    group: SocketAddrV4,
    sender: UdpSocket,
    triggers: Triggers,
    running: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
}

impl Od4Session {
    pub fn new(cid: u16) -> anyhow::Result<Self> {
        let cid = match u8::try_from(cid) {
            Ok(cid) if (2..255).contains(&cid) => cid,
            _ => bail!("Conference id {cid} must be between 2 and 254"),
        };
        let group = SocketAddrV4::new(Ipv4Addr::new(225, 0, 0, cid), OD4_PORT);

        let sender = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).context("Failed to bind OD4 sender socket")?;
        sender.set_multicast_loop_v4(true)?;

        Ok(Self {
            group,
            sender,
            triggers: Arc::new(Mutex::new(HashMap::new())),
            running: Arc::new(AtomicBool::new(true)),
            receiver: None,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Calls `callback` on the receiver thread for every envelope of `data_type`.
    pub fn data_trigger(&mut self, data_type: i32, callback: impl Fn(&Envelope) + Send + 'static) -> anyhow::Result<()> {
        self.triggers
            .lock()
            .map_err(|_| anyhow::anyhow!("OD4 trigger table poisoned"))?
            .insert(data_type, Box::new(callback));

        if self.receiver.is_none() {
            self.spawn_receiver()?;
        }

        Ok(())
    }

    pub fn send<M: DataType>(&self, message: &M, sample_time: TimeStamp, sender_stamp: u32) -> anyhow::Result<()> {
        let frame = encode_frame(&Envelope::wrap(message, sample_time, sender_stamp))?;
        self.sender.send_to(&frame, self.group)?;

        Ok(())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(receiver) = self.receiver.take() {
            if receiver.join().is_err() {
                log::error!("OD4 receiver thread panicked");
            }
        }
    }

    fn spawn_receiver(&mut self) -> anyhow::Result<()> {
        let socket = bind_shared(OD4_PORT).with_context(|| format!("Failed to bind OD4 port {OD4_PORT}"))?;
        socket.join_multicast_v4(self.group.ip(), &Ipv4Addr::UNSPECIFIED)?;
        socket.set_read_timeout(Some(RECEIVE_TIMEOUT))?;
        log::info!("Joined OD4 session {}", self.group);

        let triggers = self.triggers.clone();
        let running = self.running.clone();
        self.receiver = Some(thread::spawn(move || {
            run_receive_loop(socket, triggers, running);
        }));

        Ok(())
    }
}

impl Drop for Od4Session {
    fn drop(&mut self) {
        self.stop();
    }
}

// Other conference participants on this host listen on the same port
fn bind_shared(port: u16) -> anyhow::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into())?;

    Ok(socket.into())
}

fn run_receive_loop(socket: UdpSocket, triggers: Triggers, running: Arc<AtomicBool>) {
    let mut buffer = vec![0u8; MAX_DATAGRAM];

    while running.load(Ordering::SeqCst) {
        let size = match socket.recv(&mut buffer) {
            Ok(size) => size,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
            Err(e) => {
                log::error!("Error receiving from OD4 session: {e}");
                thread::sleep(RECEIVE_TIMEOUT);
                continue;
            }
        };

        let mut envelope = match decode_frame(&buffer[..size]) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::debug!("Skipping malformed datagram: {e}");
                continue;
            }
        };
        envelope.received = Some(TimeStamp::now());

        let Some(triggers) = triggers.lock().ok() else {
            log::error!("OD4 trigger table poisoned, stopping receiver");
            break;
        };
        if let Some(callback) = triggers.get(&envelope.data_type) {
            callback(&envelope);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::messages::GroundSteeringRequest;

    #[test]
    fn rejects_invalid_conference_ids() {
        assert!(Od4Session::new(0).is_err());
        assert!(Od4Session::new(1).is_err());
        assert!(Od4Session::new(255).is_err());
        assert!(Od4Session::new(1000).is_err());
    }

    #[test]
    fn new_session_is_running_until_stopped() {
        let mut session = Od4Session::new(111).unwrap();
        assert!(session.is_running());
        session.stop();
        assert!(!session.is_running());
    }

    #[test]
    fn receivers_share_the_port_on_one_host() {
        let mut first = Od4Session::new(113).unwrap();
        let mut second = Od4Session::new(113).unwrap();
        first.data_trigger(GroundSteeringRequest::ID, |_| {}).unwrap();
        second.data_trigger(GroundSteeringRequest::ID, |_| {}).unwrap();

        let mut other_cid = Od4Session::new(114).unwrap();
        other_cid.data_trigger(GroundSteeringRequest::ID, |_| {}).unwrap();
    }

    #[test]
    #[ignore = "requires multicast loopback and a free port 12175"]
    fn trigger_receives_sent_message() {
        let (tx, rx) = mpsc::channel();
        let mut session = Od4Session::new(112).unwrap();
        session
            .data_trigger(GroundSteeringRequest::ID, move |envelope| {
                let request = envelope.unpack::<GroundSteeringRequest>().unwrap();
                tx.send(request.ground_steering).unwrap();
            })
            .unwrap();

        session
            .send(&GroundSteeringRequest { ground_steering: 0.1 }, TimeStamp::now(), 0)
            .unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 0.1);
    }
}
