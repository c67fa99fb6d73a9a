//! The party: a pre-game lobby, pure data.
//!
//! No task of its own and no internal locking — every mutation happens
//! inside the coordinator's single-writer loop.

use std::collections::HashMap;
use std::sync::Arc;

use parlor_protocol::{ClientId, PartyId, PartyMemberInfo, ServerMessage};

use crate::client::Client;
use crate::game::GameHandle;

/// One seat in a party.
pub(crate) struct PartyMember {
    pub(crate) client: Arc<Client>,
    pub(crate) is_connected: bool,
}

/// A pre-game lobby: members, a designated host, and at most one
/// active game.
pub(crate) struct Party {
    pub(crate) id: PartyId,
    pub(crate) members: HashMap<ClientId, PartyMember>,
    pub(crate) host_id: Option<ClientId>,
    pub(crate) game: Option<GameHandle>,
    capacity: usize,
}

impl Party {
    pub(crate) fn new(id: PartyId, capacity: usize) -> Self {
        Self {
            id,
            members: HashMap::new(),
            host_id: None,
            game: None,
            capacity,
        }
    }

    /// Seats a client. The first member becomes host.
    pub(crate) fn add(&mut self, client: Arc<Client>) {
        let id = client.id.clone();
        self.members.insert(
            id.clone(),
            PartyMember {
                client,
                is_connected: true,
            },
        );
        if self.members.len() == 1 {
            self.host_id = Some(id);
        }
    }

    /// Removes a client; if the host left, any remaining member takes over.
    pub(crate) fn remove(&mut self, client_id: &ClientId) {
        self.members.remove(client_id);

        if self.host_id.as_ref() == Some(client_id) {
            self.host_id = self.members.keys().next().cloned();
        }
    }

    pub(crate) fn mark_connected(&mut self, client_id: &ClientId) -> bool {
        match self.members.get_mut(client_id) {
            Some(member) => {
                member.is_connected = true;
                true
            }
            None => false,
        }
    }

    pub(crate) fn mark_disconnected(&mut self, client_id: &ClientId) -> bool {
        match self.members.get_mut(client_id) {
            Some(member) => {
                member.is_connected = false;
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Enqueues a message on every member's send queue, connected or not.
    /// Disconnected members' queues drop frames harmlessly.
    pub(crate) fn broadcast(&self, msg: &ServerMessage) {
        for member in self.members.values() {
            member.client.send_message(msg.clone());
        }
    }

    /// Sends the current roster to every member.
    pub(crate) fn broadcast_member_update(&self) {
        self.broadcast(&ServerMessage::MemberUpdate {
            members: self.member_info(),
        });
    }

    /// Projects the membership into the `memberUpdate` payload shape.
    pub(crate) fn member_info(&self) -> Vec<PartyMemberInfo> {
        self.members
            .values()
            .map(|member| PartyMemberInfo {
                id: member.client.id.clone(),
                is_host: self.host_id.as_ref() == Some(&member.client.id),
                is_connected: member.is_connected,
            })
            .collect()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use parlor_protocol::SecretKey;
    use tokio::sync::mpsc;

    use super::*;
    use crate::client::SEND_QUEUE_SIZE;

    fn client() -> (Arc<Client>, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_SIZE);
        let c = Client::new(ClientId::generate(), SecretKey::generate(), tx);
        (c, rx)
    }

    fn party() -> Party {
        Party::new(PartyId::generate(), 6)
    }

    #[test]
    fn test_first_member_becomes_host() {
        let mut p = party();
        let (a, _rx) = client();
        let (b, _rx) = client();

        p.add(a.clone());
        p.add(b);

        assert_eq!(p.host_id, Some(a.id.clone()));
    }

    #[test]
    fn test_remove_host_elects_remaining_member() {
        let mut p = party();
        let (a, _rx_a) = client();
        let (b, _rx_b) = client();
        p.add(a.clone());
        p.add(b.clone());

        p.remove(&a.id);

        assert_eq!(p.host_id, Some(b.id.clone()));
        assert!(!p.members.contains_key(&a.id));
    }

    #[test]
    fn test_remove_last_member_clears_host() {
        let mut p = party();
        let (a, _rx) = client();
        p.add(a.clone());

        p.remove(&a.id);

        assert!(p.is_empty());
        assert_eq!(p.host_id, None);
    }

    #[test]
    fn test_remove_non_host_keeps_host() {
        let mut p = party();
        let (a, _rx_a) = client();
        let (b, _rx_b) = client();
        p.add(a.clone());
        p.add(b.clone());

        p.remove(&b.id);

        assert_eq!(p.host_id, Some(a.id.clone()));
    }

    #[test]
    fn test_is_full_at_capacity() {
        let mut p = Party::new(PartyId::generate(), 2);
        assert!(!p.is_full());

        let (a, _rx_a) = client();
        let (b, _rx_b) = client();
        p.add(a);
        assert!(!p.is_full());
        p.add(b);
        assert!(p.is_full());
    }

    #[test]
    fn test_mark_connection_status() {
        let mut p = party();
        let (a, _rx) = client();
        p.add(a.clone());

        assert!(p.mark_disconnected(&a.id));
        assert!(!p.members[&a.id].is_connected);

        assert!(p.mark_connected(&a.id));
        assert!(p.members[&a.id].is_connected);

        assert!(!p.mark_disconnected(&ClientId::generate()));
    }

    #[test]
    fn test_member_info_reflects_host_and_connection() {
        let mut p = party();
        let (a, _rx_a) = client();
        let (b, _rx_b) = client();
        p.add(a.clone());
        p.add(b.clone());
        p.mark_disconnected(&b.id);

        let info = p.member_info();
        assert_eq!(info.len(), 2);

        let a_info = info.iter().find(|m| m.id == a.id).unwrap();
        assert!(a_info.is_host);
        assert!(a_info.is_connected);

        let b_info = info.iter().find(|m| m.id == b.id).unwrap();
        assert!(!b_info.is_host);
        assert!(!b_info.is_connected);
    }

    #[test]
    fn test_broadcast_reaches_all_members() {
        let mut p = party();
        let (a, mut rx_a) = client();
        let (b, mut rx_b) = client();
        p.add(a);
        p.add(b);

        p.broadcast(&ServerMessage::QueueJoined {});

        assert_eq!(rx_a.try_recv().unwrap(), ServerMessage::QueueJoined {});
        assert_eq!(rx_b.try_recv().unwrap(), ServerMessage::QueueJoined {});
    }
}
