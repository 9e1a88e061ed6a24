//! Point-to-point forwarding. The relay never looks inside these payloads.

use serde_json::Value;
use tracing::debug;

use crate::protocol::{DirectMessage, FileDelivery, FileTransfer, ServerEvent};

use super::{ConnId, HubError, State};

/// Private rooms are named `<prefix>-<a>-<b>`; the third segment is who the file is for.
pub fn direct_recipient(room_key: &str) -> Option<&str> {
    room_key.split('-').nth(2).filter(|s| !s.is_empty())
}

#[derive(Debug, PartialEq, Eq)]
pub enum FileRoute {
    Direct(ConnId),
    Room,
}

impl State {
    fn resolve(&self, to: &str) -> Result<ConnId, HubError> {
        self.identities.lookup(to).ok_or_else(|| {
            debug!(target_identity = %to, "dropping relay to offline identity");
            HubError::UnresolvedTarget(to.to_owned())
        })
    }

    /// Only the offer carries who it came from; the answer and candidates don't.
    pub(super) fn relay_offer(
        &self,
        conn: ConnId,
        to: &str,
        offer: Value,
        kind: Option<String>,
    ) -> Result<ConnId, HubError> {
        let target = self.resolve(to)?;
        let from = self.identity_of(conn);
        self.send(target, ServerEvent::Offer { offer, from, kind });
        Ok(target)
    }

    pub(super) fn relay_answer(&self, to: &str, answer: Value) -> Result<ConnId, HubError> {
        let target = self.resolve(to)?;
        self.send(target, ServerEvent::Answer { answer });
        Ok(target)
    }

    pub(super) fn relay_candidate(&self, to: &str, candidate: Value) -> Result<ConnId, HubError> {
        let target = self.resolve(to)?;
        self.send(target, ServerEvent::Candidate { candidate });
        Ok(target)
    }

    /// Delivered to the recipient and echoed back to whoever sent it.
    pub(super) fn relay_private(&self, conn: ConnId, dm: DirectMessage) -> Result<ConnId, HubError> {
        let target = self.resolve(&dm.to)?;
        let mut message = dm;
        message.seen = false;

        if target != conn {
            self.send(conn, ServerEvent::PrivateMessage(message.clone()));
        }
        self.send(target, ServerEvent::PrivateMessage(message));
        Ok(target)
    }

    /// Direct if the room key names a connected recipient, otherwise the whole room.
    pub(super) fn relay_file(&self, conn: ConnId, transfer: FileTransfer) -> FileRoute {
        let recipient = direct_recipient(&transfer.room).and_then(|who| self.identities.lookup(who));
        let room = transfer.room.clone();
        let delivery = ServerEvent::File(FileDelivery {
            transfer,
            timestamp: crate::clock_label(),
            seen: false,
        });

        match recipient {
            Some(target) => {
                if target != conn {
                    self.send(conn, delivery.clone());
                }
                self.send(target, delivery);
                FileRoute::Direct(target)
            }
            None => {
                self.broadcast_room(&room, delivery, None);
                FileRoute::Room
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::testing::*;
    use super::*;

    fn dm(to: &str, text: &str) -> DirectMessage {
        DirectMessage {
            to: to.into(),
            id: None,
            username: "alice".into(),
            text: text.into(),
            timestamp: None,
            seen: true,
            extra: Default::default(),
        }
    }

    #[test]
    fn recipient_is_third_segment() {
        assert_eq!(direct_recipient("private-alice-bob"), Some("bob"));
        assert_eq!(direct_recipient("General"), None);
        assert_eq!(direct_recipient("a-b"), None);
        assert_eq!(direct_recipient("a-b-"), None);
    }

    #[test]
    fn offer_carries_sender() {
        let mut state = state();
        let (alice, mut a) = joined(&mut state, "alice", "General");
        let (bob, mut b) = joined(&mut state, "bob", "Tech");
        drain(&mut a);

        let target = state
            .relay_offer(alice, "bob", json!({ "sdp": "v=0" }), Some("video".into()))
            .unwrap();

        assert_eq!(target, bob);
        assert_eq!(
            drain(&mut b),
            vec![ServerEvent::Offer {
                offer: json!({ "sdp": "v=0" }),
                from: Some("alice".into()),
                kind: Some("video".into()),
            }]
        );
        assert!(drain(&mut a).is_empty());
    }

    #[test]
    fn answer_and_candidate_to_nobody_are_dropped() {
        let mut state = state();
        let (_alice, mut a) = joined(&mut state, "alice", "General");

        assert_eq!(
            state.relay_answer("carol", json!({})).unwrap_err(),
            HubError::UnresolvedTarget("carol".into())
        );
        assert!(state.relay_candidate("carol", json!({})).is_err());
        assert!(drain(&mut a).is_empty());
    }

    #[test]
    fn private_message_reaches_both_ends() {
        let mut state = state();
        let (alice, mut a) = joined(&mut state, "alice", "General");
        let (_bob, mut b) = joined(&mut state, "bob", "General");
        drain(&mut a);

        state.relay_private(alice, dm("bob", "psst")).unwrap();

        let got_a = drain(&mut a);
        let got_b = drain(&mut b);
        assert_eq!(got_a, got_b);
        assert!(matches!(&got_b[..], [ServerEvent::PrivateMessage(m)] if !m.seen && m.text == "psst"));
    }

    #[test]
    fn private_message_to_nobody_is_dropped() {
        let mut state = state();
        let (alice, mut a) = joined(&mut state, "alice", "General");
        drain(&mut a);

        assert_eq!(
            state.relay_private(alice, dm("ghost", "anyone?")).unwrap_err(),
            HubError::UnresolvedTarget("ghost".into())
        );
        assert!(drain(&mut a).is_empty());
    }

    #[test]
    fn file_goes_direct_when_recipient_is_online() {
        let mut state = state();
        let (alice, mut a) = joined(&mut state, "alice", "General");
        let (bob, mut b) = joined(&mut state, "bob", "General");
        let (_carol, mut c) = joined(&mut state, "carol", "General");
        drain(&mut a);
        drain(&mut b);

        let route = state.relay_file(
            alice,
            FileTransfer {
                username: "alice".into(),
                room: "private-alice-bob".into(),
                file: json!("data:text/plain;base64,aGk="),
                kind: "text/plain".into(),
                name: "hi.txt".into(),
            },
        );

        assert_eq!(route, FileRoute::Direct(bob));
        assert_eq!(drain(&mut a).len(), 1);
        assert_eq!(drain(&mut b).len(), 1);
        assert!(drain(&mut c).is_empty());
    }

    #[test]
    fn file_falls_back_to_room() {
        let mut state = state();
        let (alice, mut a) = joined(&mut state, "alice", "General");
        let (_bob, mut b) = joined(&mut state, "bob", "General");
        let (_dave, mut d) = joined(&mut state, "dave", "Tech");
        drain(&mut a);
        drain(&mut b);

        let route = state.relay_file(
            alice,
            FileTransfer {
                username: "alice".into(),
                room: "General".into(),
                file: json!("..."),
                kind: "image/png".into(),
                name: "cat.png".into(),
            },
        );

        assert_eq!(route, FileRoute::Room);
        assert!(matches!(&drain(&mut a)[..], [ServerEvent::File(f)] if f.transfer.name == "cat.png" && !f.seen));
        assert_eq!(drain(&mut b).len(), 1);
        assert!(drain(&mut d).is_empty());
    }
}
