//! Property tests for the session step graph
//!
//! Random action sequences are folded over a fresh session; rejected actions
//! are dropped the way the store drops them.

use jsdos_core::{
    Action, BundleConfig, EmulatorStats, IpxStatus, PeeringPhase, Session, Step,
};
use proptest::prelude::*;

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        "[a-z0-9.]{1,8}".prop_map(Action::EmuReady),
        "[a-z ]{0,8}".prop_map(Action::EmuError),
        "[a-z]{1,8}\\.jsdos".prop_map(Action::BndLoad),
        "[a-z ]{0,8}".prop_map(Action::BndError),
        Just(Action::BndConfig),
        Just(Action::BndReady(BundleConfig::default())),
        Just(Action::BndPlay),
        any::<bool>().prop_map(Action::Paused),
        (0.0f64..1.0).prop_map(Action::Volume),
        any::<bool>().prop_map(Action::Ci),
        Just(Action::Peering(PeeringPhase::Pending)),
        Just(Action::Peering(PeeringPhase::Fulfilled)),
        Just(Action::Peering(PeeringPhase::Rejected)),
        Just(Action::DisconnectIpx),
        (0.0f64..5000.0).prop_map(|cycles| Action::Stats(EmulatorStats {
            cycles_per_ms: cycles,
            ..Default::default()
        })),
    ]
}

fn is_documented_edge(from: Step, to: Step) -> bool {
    use Step::*;
    from == to
        || matches!(
            (from, to),
            (EmuInit, EmuReady)
                | (EmuInit, EmuError)
                | (EmuReady, BndLoad)
                | (BndLoad, BndError)
                | (BndConfig, BndError)
                | (BndLoad, BndConfig)
                | (BndConfig, BndReady)
                | (BndReady, BndPlay)
                | (BndError, BndLoad)
                | (BndReady, BndLoad)
                | (BndPlay, BndLoad)
        )
}

proptest! {
    #[test]
    fn step_only_follows_documented_edges(actions in prop::collection::vec(action_strategy(), 0..64)) {
        let mut session = Session::default();
        let mut seen_ready_since_load = false;

        for action in actions {
            let before = session.step;
            if let Ok(transition) = session.apply(action) {
                let after = transition.session.step;
                prop_assert!(is_documented_edge(before, after), "{} -> {}", before, after);

                if after == Step::BndLoad {
                    seen_ready_since_load = false;
                }
                if after == Step::BndReady {
                    seen_ready_since_load = true;
                }
                if after == Step::BndPlay {
                    prop_assert!(seen_ready_since_load);
                }
                if after.is_error() {
                    prop_assert!(transition.session.error.as_deref().is_some_and(|e| !e.is_empty()));
                } else if after != before {
                    prop_assert!(transition.session.error.is_none());
                }

                session = transition.session;
            }
        }
    }

    #[test]
    fn peering_state_never_moves_step(actions in prop::collection::vec(action_strategy(), 0..32)) {
        let mut session = Session::default();
        for action in actions {
            let is_peering = matches!(action, Action::Peering(_) | Action::DisconnectIpx);
            if let Ok(transition) = session.apply(action) {
                if is_peering {
                    prop_assert_eq!(transition.session.step, session.step);
                }
                if transition.session.step == Step::BndLoad && session.step != Step::BndLoad {
                    prop_assert_eq!(transition.session.network.ipx, IpxStatus::Disconnected);
                }
                session = transition.session;
            }
        }
    }

    #[test]
    fn replay_matches_incremental_application(actions in prop::collection::vec(action_strategy(), 0..32)) {
        let mut incremental = Session::default();
        for action in actions.clone() {
            if let Ok(transition) = incremental.apply(action) {
                incremental = transition.session;
            }
        }
        prop_assert_eq!(Session::replay(Session::default(), actions), incremental);
    }
}
