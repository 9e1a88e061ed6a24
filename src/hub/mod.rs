//! The relay's whole world: who is connected, which rooms exist, who is in them,
//! which messages have been seen, and who is friends with whom.
//!
//! Everything lives in one [`State`] behind one mutex. Each inbound event runs to
//! completion under that lock, sends included, so no two events ever interleave.
//! Expiry timers take the same lock when they fire.

mod catalog;
mod error;
mod expiry;
mod friends;
mod identity;
mod ledger;
mod notice;
mod presence;
mod relay;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::HubConfig;
use crate::protocol::{ChatMessage, ClientEvent, MessageId, RoomMessage, ServerEvent};

pub use catalog::RoomCatalog;
pub use error::HubError;
pub use expiry::{delay_until, ExpiryScheduler};
pub use friends::FriendGraph;
pub use identity::IdentityRegistry;
pub use ledger::{Ack, MessageLedger};
pub use presence::PresenceTracker;
pub use relay::direct_recipient;

pub type ConnId = Uuid;
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;
pub type Inbox = mpsc::UnboundedReceiver<ServerEvent>;

/// Author of join/leave notices.
pub const SYSTEM: &str = "System";

#[derive(Debug)]
struct Connection {
    outbox: Outbox,
    identity: Option<String>,
    room: Option<String>,
}

/// What `GET /rooms/{name}` shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomView {
    pub name: String,
    pub members: Vec<String>,
    pub expires_at: Option<i64>,
}

#[derive(Debug)]
pub struct State {
    connections: HashMap<ConnId, Connection>,
    identities: IdentityRegistry,
    catalog: RoomCatalog,
    presence: PresenceTracker,
    expiry: ExpiryScheduler,
    ledger: MessageLedger,
    friends: FriendGraph,
}

impl State {
    pub fn new(config: &HubConfig) -> Self {
        Self {
            connections: HashMap::new(),
            identities: IdentityRegistry::default(),
            catalog: RoomCatalog::seeded(config.default_rooms.iter().cloned()),
            presence: PresenceTracker::default(),
            expiry: ExpiryScheduler::default(),
            ledger: MessageLedger::with_capacity(config.max_messages),
            friends: FriendGraph::default(),
        }
    }

    fn attach(&mut self) -> (ConnId, Inbox) {
        let id = Uuid::now_v7();
        let (outbox, inbox) = mpsc::unbounded_channel();
        self.connections.insert(
            id,
            Connection {
                outbox,
                identity: None,
                room: None,
            },
        );
        (id, inbox)
    }

    /// Runs the cleanup cascade. Only the first call for a connection does anything.
    fn detach(&mut self, conn: ConnId) -> bool {
        let Some(gone) = self.connections.remove(&conn) else {
            return false;
        };
        if let Some(identity) = gone.identity {
            self.identities.unbind(&identity, conn);
            if let Some(room) = gone.room {
                self.depart(&room, &identity);
            }
            info!(%identity, "disconnected");
        }
        true
    }

    fn identity_of(&self, conn: ConnId) -> Option<String> {
        self.connections.get(&conn)?.identity.clone()
    }

    // Sends never block and never fail the event: a closed outbox just means
    // that connection is about to be detached.

    fn send(&self, conn: ConnId, event: ServerEvent) {
        if let Some(c) = self.connections.get(&conn) {
            let _ = c.outbox.send(event);
        }
    }

    fn send_to_identity(&self, identity: &str, event: ServerEvent) -> bool {
        match self.identities.lookup(identity) {
            Some(conn) => {
                self.send(conn, event);
                true
            }
            None => false,
        }
    }

    fn broadcast_room(&self, room: &str, event: ServerEvent, except: Option<ConnId>) {
        for (id, c) in &self.connections {
            if c.room.as_deref() == Some(room) && Some(*id) != except {
                let _ = c.outbox.send(event.clone());
            }
        }
    }

    fn broadcast_all(&self, event: ServerEvent) {
        for c in self.connections.values() {
            let _ = c.outbox.send(event.clone());
        }
    }

    fn broadcast_presence(&self, room: &str) {
        self.broadcast_room(room, ServerEvent::OnlineUsers(self.presence.members(room)), None);
    }

    fn announce(&self, room: &str, text: String) {
        let notice = RoomMessage {
            room: room.to_owned(),
            message: ChatMessage {
                id: MessageId::Text(Uuid::now_v7().to_string()),
                username: SYSTEM.to_owned(),
                text,
                timestamp: Some(crate::clock_label()),
                seen: true,
                extra: Default::default(),
            },
        };
        self.broadcast_room(room, ServerEvent::Message(notice), None);
    }

    /// Presence half of leaving. The caller has already detached the connection from `room`.
    fn depart(&mut self, room: &str, identity: &str) {
        if self.presence.leave(room, identity) {
            self.broadcast_presence(room);
        }
        self.announce(room, format!("{identity} left the room"));
    }

    fn join(&mut self, conn: ConnId, identity: &str, room: &str) -> Result<(), HubError> {
        if !self.connections.contains_key(&conn) {
            return Err(HubError::Detached);
        }
        if let Err(err) = self.identities.bind(identity, conn) {
            self.send(conn, ServerEvent::Error(err.to_string()));
            return Err(err);
        }

        let c = self.connections.get_mut(&conn).ok_or(HubError::Detached)?;
        let prev_identity = c.identity.replace(identity.to_owned());
        let prev_room = c.room.replace(room.to_owned());

        if let Some(prev) = prev_identity.as_deref().filter(|prev| *prev != identity) {
            self.identities.unbind(prev, conn);
        }
        if let (Some(prev_room), Some(prev_identity)) = (prev_room, prev_identity) {
            if prev_room != room || prev_identity != identity {
                self.depart(&prev_room, &prev_identity);
            }
        }

        if self.presence.join(room, identity) {
            info!(%identity, %room, "joined");
        }
        self.broadcast_presence(room);
        self.announce(room, format!("{identity} joined the room"));

        self.catalog.ensure(room);
        self.broadcast_all(ServerEvent::RoomList(self.catalog.list()));
        Ok(())
    }

    fn create_room(&mut self, name: &str) -> bool {
        if !self.catalog.ensure(name) {
            return false;
        }
        info!(room = %name, "room created");
        self.broadcast_all(ServerEvent::RoomList(self.catalog.list()));
        true
    }

    fn post(&mut self, RoomMessage { room, mut message }: RoomMessage) {
        if self.ledger.contains(&room, &message.id) {
            let fresh = MessageId::Text(Uuid::now_v7().to_string());
            debug!(%room, taken = %message.id, %fresh, "message id collision, reassigning");
            message.id = fresh;
        }
        self.ledger.record(&room, message.id.clone(), &message.username);

        message.seen = false;
        let target = room.clone();
        self.broadcast_room(&target, ServerEvent::Message(RoomMessage { room, message }), None);
    }

    fn acknowledge(&mut self, conn: ConnId, room: &str, id: MessageId) -> Result<Ack, HubError> {
        let identity = self.identity_of(conn).ok_or(HubError::NotJoined)?;
        let online = self.presence.online_count(room);

        let ack = self.ledger.acknowledge(room, &id, &identity, online)?;
        if ack == Ack::FullySeen {
            debug!(%room, %id, "fully seen");
            self.broadcast_room(room, ServerEvent::SeenUpdate { id, seen: true }, None);
        }
        Ok(ack)
    }

    fn befriend(&mut self, a: &str, b: &str) {
        self.friends.befriend(a, b);
        for who in [a, b] {
            self.send_to_identity(who, ServerEvent::FriendsUpdate(self.friends.friends_of(who)));
        }
    }

    /// Expiry firing: everyone in the room hears about it once, then the room is emptied.
    /// The name stays in the catalog so the room can be joined again.
    fn evict(&mut self, room: &str) -> Vec<String> {
        self.broadcast_room(room, ServerEvent::RoomExpiry, None);
        for c in self.connections.values_mut() {
            if c.room.as_deref() == Some(room) {
                c.room = None;
            }
        }
        self.presence.evict(room)
    }

    fn room_view(&self, name: &str) -> Option<RoomView> {
        self.catalog.contains(name).then(|| RoomView {
            name: name.to_owned(),
            members: self.presence.members(name),
            expires_at: self.expiry.deadline(name),
        })
    }
}

/// Cheap to clone; every clone talks to the same state.
#[derive(Clone, Debug)]
pub struct Hub {
    state: Arc<Mutex<State>>,
}

impl Hub {
    pub fn new(config: &HubConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new(config))),
        }
    }

    pub async fn attach(&self) -> (ConnId, Inbox) {
        self.state.lock().await.attach()
    }

    pub async fn detach(&self, conn: ConnId) -> bool {
        self.state.lock().await.detach(conn)
    }

    /// Applies one inbound event. Errors describe why it was a no-op; none are fatal.
    pub async fn handle(&self, conn: ConnId, event: ClientEvent) -> Result<(), HubError> {
        let mut state = self.state.lock().await;
        if !state.connections.contains_key(&conn) {
            return Err(HubError::Detached);
        }

        use ClientEvent::*;
        match event {
            Join { username, room, expiry } => {
                state.join(conn, &username, &room)?;
                if let Some(deadline) = expiry.filter(|d| *d != 0) {
                    self.schedule_expiry(&mut state, &room, deadline);
                }
            }
            Message(msg) => state.post(msg),
            PrivateMessage(dm) => {
                state.relay_private(conn, dm)?;
            }
            AddFriend { username, friend } => state.befriend(&username, &friend),
            CreateRoom { name, expiry } => {
                if state.create_room(&name) {
                    if let Some(deadline) = expiry.filter(|d| *d != 0) {
                        self.schedule_expiry(&mut state, &name, deadline);
                    }
                }
            }
            Typing { username, room } => state.typing(conn, &room, ServerEvent::Typing(username)),
            StopTyping { username, room } => {
                state.typing(conn, &room, ServerEvent::StopTyping(username))
            }
            Seen { room, id } => {
                state.acknowledge(conn, &room, id)?;
            }
            File(transfer) => {
                state.relay_file(conn, transfer);
            }
            Offer { offer, to, kind } => {
                state.relay_offer(conn, &to, offer, kind)?;
            }
            Answer { answer, to } => {
                state.relay_answer(&to, answer)?;
            }
            Candidate { candidate, to } => {
                state.relay_candidate(&to, candidate)?;
            }
            Reaction { id, reaction } => info!(%id, %reaction, "reaction"),
            CanvasUpdate { room, data } => state.canvas(&room, data),
            AiQuery { room, query } => state.ai_query(conn, &room, &query),
        }
        Ok(())
    }

    /// Arms (or re-arms) the room's eviction timer. Must be called with the lock held.
    fn schedule_expiry(&self, state: &mut State, room: &str, deadline_ms: i64) {
        let delay = delay_until(deadline_ms, crate::now_millis());
        let token = state.expiry.next_token();

        let hub = self.clone();
        let name = room.to_owned();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            hub.expire(&name, token).await;
        });

        if state.expiry.replace(room, token, deadline_ms, task) {
            debug!(%room, "previous expiry cancelled");
        }
        info!(%room, deadline_ms, "expiry scheduled in {:?}", delay);
    }

    async fn expire(&self, room: &str, token: u64) {
        let mut state = self.state.lock().await;
        if !state.expiry.take_if_current(room, token) {
            return;
        }
        let evicted = state.evict(room);
        info!(%room, evicted = evicted.len(), "room expired");
    }

    pub async fn rooms(&self) -> Vec<String> {
        self.state.lock().await.catalog.list()
    }

    pub async fn room(&self, name: &str) -> Option<RoomView> {
        self.state.lock().await.room_view(name)
    }

    pub async fn online(&self, room: &str) -> Vec<String> {
        self.state.lock().await.presence.members(room)
    }

    pub async fn friends_of(&self, identity: &str) -> Vec<String> {
        self.state.lock().await.friends.friends_of(identity)
    }

    pub async fn lookup(&self, identity: &str) -> Option<ConnId> {
        self.state.lock().await.identities.lookup(identity)
    }

    /// Acknowledgers and seen flag of a stored message, if it is still in the ledger.
    pub async fn message_status(&self, room: &str, id: &MessageId) -> Option<(usize, bool)> {
        let state = self.state.lock().await;
        state
            .ledger
            .get(room, id)
            .map(|entry| (entry.ack_count(), entry.fully_seen))
    }
}
