#[cfg(test)]
mod tests {
    use crate::membership::types::{now_seconds, Peer, PeerStatus, CLIENT_ID, COORDINATOR_ID};
    use crate::membership::view::MembershipView;

    fn peer(id: i64, address: &str, last_updated: u64) -> Peer {
        Peer {
            id,
            address: address.to_string(),
            status: if id == COORDINATOR_ID {
                PeerStatus::Coordinator
            } else if id == CLIENT_ID {
                PeerStatus::Client
            } else {
                PeerStatus::Node
            },
            is_down: false,
            last_updated,
        }
    }

    // ============================================================
    // RING SIZE
    // ============================================================

    #[test]
    fn test_ring_size_excludes_reserved_ids() {
        let view = MembershipView::new();
        view.insert(peer(COORDINATOR_ID, "127.0.0.1", 10));
        view.insert(peer(CLIENT_ID, "127.0.0.9", 10));
        view.insert(peer(1, "127.0.0.2", 10));
        view.insert(peer(2, "127.0.0.3", 10));

        assert_eq!(view.ring_size(), 2);
        assert_eq!(view.len(), 4);
    }

    #[test]
    fn test_ring_size_counts_down_peers() {
        let view = MembershipView::new();
        view.insert(peer(1, "127.0.0.2", 10));
        view.insert(peer(2, "127.0.0.3", 10));
        view.mark_down(2);

        // Downed peers still belong to the ring; only membership changes
        // the ring size.
        assert_eq!(view.ring_size(), 2);
    }

    // ============================================================
    // MERGE RULE
    // ============================================================

    #[test]
    fn test_merge_inserts_unknown_peer() {
        let view = MembershipView::new();
        assert!(view.merge(peer(3, "127.0.0.4", 100)));
        assert_eq!(view.get(3).unwrap().address, "127.0.0.4");
    }

    #[test]
    fn test_merge_prefers_fresher_record() {
        let view = MembershipView::new();
        view.insert(peer(3, "127.0.0.4", 100));

        let mut fresher = peer(3, "127.0.0.4", 200);
        fresher.is_down = true;
        assert!(view.merge(fresher));
        assert!(view.get(3).unwrap().is_down);
        assert_eq!(view.get(3).unwrap().last_updated, 200);
    }

    #[test]
    fn test_merge_ignores_stale_record() {
        let view = MembershipView::new();
        view.insert(peer(3, "127.0.0.4", 100));

        let mut stale = peer(3, "10.0.0.1", 50);
        stale.is_down = true;
        assert!(!view.merge(stale));

        let kept = view.get(3).unwrap();
        assert_eq!(kept.address, "127.0.0.4");
        assert!(!kept.is_down);
        assert_eq!(kept.last_updated, 100);
    }

    #[test]
    fn test_merge_ignores_equal_timestamp() {
        let view = MembershipView::new();
        view.insert(peer(3, "127.0.0.4", 100));
        assert!(!view.merge(peer(3, "10.0.0.1", 100)));
        assert_eq!(view.get(3).unwrap().address, "127.0.0.4");
    }

    #[test]
    fn test_merge_never_decreases_last_updated() {
        let view = MembershipView::new();
        view.insert(peer(5, "127.0.0.6", 300));

        for stamp in [100, 250, 300, 299] {
            view.merge(peer(5, "127.0.0.6", stamp));
            assert!(view.get(5).unwrap().last_updated >= 300);
        }

        view.merge(peer(5, "127.0.0.6", 400));
        assert_eq!(view.get(5).unwrap().last_updated, 400);
    }

    // ============================================================
    // DOWN MARKING
    // ============================================================

    #[test]
    fn test_mark_down_and_up() {
        let view = MembershipView::new();
        view.insert(peer(2, "127.0.0.3", 10));

        view.mark_down(2);
        assert!(view.get(2).unwrap().is_down);

        view.mark_up(2);
        let restored = view.get(2).unwrap();
        assert!(!restored.is_down);
        assert!(restored.last_updated >= now_seconds() - 1);
    }

    #[test]
    fn test_touch_refreshes_last_updated() {
        let view = MembershipView::new();
        view.insert(peer(2, "127.0.0.3", 10));
        view.touch(2);
        assert!(view.get(2).unwrap().last_updated >= now_seconds() - 1);
    }

    // ============================================================
    // ID ASSIGNMENT
    // ============================================================

    #[test]
    fn test_next_id_starts_at_one() {
        let view = MembershipView::new();
        view.insert(peer(COORDINATOR_ID, "127.0.0.1", 10));
        assert_eq!(view.next_id(), 1);
    }

    #[test]
    fn test_next_id_is_monotone() {
        let view = MembershipView::new();
        view.insert(peer(COORDINATOR_ID, "127.0.0.1", 10));
        view.insert(peer(1, "127.0.0.2", 10));
        view.insert(peer(7, "127.0.0.3", 10));
        // Reserved client id must not influence assignment.
        view.insert(peer(CLIENT_ID, "127.0.0.9", 10));

        assert_eq!(view.next_id(), 8);
    }

    // ============================================================
    // SORTED DATA PEERS AND RANDOM SELECTION
    // ============================================================

    #[test]
    fn test_data_peers_sorted_by_id() {
        let view = MembershipView::new();
        view.insert(peer(COORDINATOR_ID, "127.0.0.1", 10));
        view.insert(peer(3, "127.0.0.4", 10));
        view.insert(peer(1, "127.0.0.2", 10));
        view.insert(peer(2, "127.0.0.3", 10));

        let ids: Vec<i64> = view.data_peers_sorted().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_random_data_peer_respects_exclusions() {
        let view = MembershipView::new();
        view.insert(peer(COORDINATOR_ID, "127.0.0.1", 10));
        view.insert(peer(1, "127.0.0.2", 10));
        view.insert(peer(2, "127.0.0.3", 10));

        for _ in 0..20 {
            let picked = view.random_data_peer(&[1]).unwrap();
            assert_eq!(picked.id, 2);
        }

        assert!(view.random_data_peer(&[1, 2]).is_none());
    }

    #[test]
    fn test_random_data_peer_skips_down_peers() {
        let view = MembershipView::new();
        view.insert(peer(1, "127.0.0.2", 10));
        view.insert(peer(2, "127.0.0.3", 10));
        view.mark_down(2);

        for _ in 0..20 {
            assert_eq!(view.random_data_peer(&[]).unwrap().id, 1);
        }
    }

    // ============================================================
    // PIGGYBACK SNAPSHOT
    // ============================================================

    #[test]
    fn test_snapshot_omits_clients_and_destination_host() {
        let view = MembershipView::new();
        view.insert(peer(COORDINATOR_ID, "127.0.0.1", 10));
        view.insert(peer(1, "127.0.0.2", 10));
        view.insert(peer(2, "127.0.0.3", 10));
        view.insert(peer(CLIENT_ID, "127.0.0.9", 10));

        let snapshot = view.snapshot_for(COORDINATOR_ID, "127.0.0.2");
        let ids: Vec<i64> = snapshot.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![COORDINATOR_ID, 2]);
    }

    #[test]
    fn test_snapshot_stamps_own_block_with_now() {
        let view = MembershipView::new();
        view.insert(peer(COORDINATOR_ID, "127.0.0.1", 10));
        view.insert(peer(1, "127.0.0.2", 10));

        let snapshot = view.snapshot_for(COORDINATOR_ID, "127.0.0.5");
        let own = snapshot.iter().find(|p| p.id == COORDINATOR_ID).unwrap();
        assert!(own.last_updated >= now_seconds() - 1);

        let other = snapshot.iter().find(|p| p.id == 1).unwrap();
        assert_eq!(other.last_updated, 10);
    }

    // ============================================================
    // PEER RECORD BASICS
    // ============================================================

    #[test]
    fn test_peer_data_bearing() {
        assert!(peer(1, "127.0.0.2", 0).is_data_bearing());
        assert!(!peer(COORDINATOR_ID, "127.0.0.1", 0).is_data_bearing());
        assert!(!peer(CLIENT_ID, "127.0.0.9", 0).is_data_bearing());
    }

    #[test]
    fn test_status_wire_forms() {
        for status in [PeerStatus::Coordinator, PeerStatus::Node, PeerStatus::Client] {
            assert_eq!(PeerStatus::from_wire(status.as_wire()), Some(status));
        }
        assert_eq!(PeerStatus::from_wire("GATEWAY"), None);
    }
}
