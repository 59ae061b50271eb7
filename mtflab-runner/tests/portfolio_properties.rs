//! Property tests for the signal-driven portfolio simulator.

use mtflab_core::rules::Direction;
use mtflab_core::sim::{SimulationEngine, SimulationRequest};
use mtflab_runner::metrics::max_drawdown;
use mtflab_runner::SignalPortfolio;
use proptest::prelude::*;

fn market() -> impl Strategy<Value = (Vec<f64>, Vec<bool>, Vec<bool>)> {
    (5usize..120).prop_flat_map(|n| {
        (
            prop::collection::vec(0.5f64..2.0, n),
            prop::collection::vec(any::<bool>(), n),
            prop::collection::vec(any::<bool>(), n),
        )
    })
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Long), Just(Direction::Short)]
}

proptest! {
    #[test]
    fn equity_is_finite_and_never_negative(
        (close, entries, exits) in market(),
        direction in direction(),
        fee in 0.0f64..0.01,
    ) {
        let request = SimulationRequest {
            close: &close,
            entries: &entries,
            exits: &exits,
            direction,
            initial_capital: 10_000.0,
            fee,
            periods_per_year: 2190.0,
        };
        let run = SignalPortfolio.run(&request).unwrap();

        prop_assert_eq!(run.equity.len(), close.len());
        for eq in &run.equity {
            prop_assert!(eq.is_finite());
            prop_assert!(*eq >= 0.0);
        }
        prop_assert!(run.fees_paid >= 0.0);

        let dd = max_drawdown(&run.equity);
        prop_assert!((-1.0..=0.0).contains(&dd));
    }

    #[test]
    fn trades_are_ordered_and_only_the_last_may_be_open(
        (close, entries, exits) in market(),
        direction in direction(),
    ) {
        let request = SimulationRequest {
            close: &close,
            entries: &entries,
            exits: &exits,
            direction,
            initial_capital: 10_000.0,
            fee: 0.0002,
            periods_per_year: 2190.0,
        };
        let run = SignalPortfolio.run(&request).unwrap();

        for pair in run.trades.windows(2) {
            prop_assert!(pair[0].exit_bar <= pair[1].entry_bar);
            prop_assert!(!pair[0].open);
        }
        for t in &run.trades {
            prop_assert!(t.entry_bar <= t.exit_bar);
            prop_assert!(t.open || t.entry_bar < t.exit_bar);
            prop_assert!(entries[t.entry_bar]);
        }
    }

    #[test]
    fn no_entries_keeps_capital_untouched(
        (close, _, exits) in market(),
        direction in direction(),
    ) {
        let entries = vec![false; close.len()];
        let request = SimulationRequest {
            close: &close,
            entries: &entries,
            exits: &exits,
            direction,
            initial_capital: 10_000.0,
            fee: 0.001,
            periods_per_year: 2190.0,
        };
        let stats = SignalPortfolio.simulate(&request).unwrap();
        prop_assert_eq!(stats.trade_count, 0);
        prop_assert_eq!(stats.total_return, 0.0);
        prop_assert_eq!(stats.max_drawdown, 0.0);
    }
}
