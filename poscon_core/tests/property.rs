use poscon_core::{ControllerCfg, Decimal, IntegralSaturation, PositionController, PulseCounter};
use proptest::prelude::*;

fn controller(kp: i64, ki: i64, limit: i32, anti_windup: bool) -> PositionController {
    let cfg = ControllerCfg {
        output_limit: limit,
        proportional_gain: Decimal::new(i128::from(kp), 4),
        integral_gain: Decimal::new(i128::from(ki), 4),
        anti_windup,
        integral_saturation: IntegralSaturation::Freeze,
        history_len: 3,
    };
    PositionController::new(&cfg, 4)
}

prop_compose! {
    // Gains in [-100, 100] at four decimal places.
    fn gain()(units in -1_000_000i64..=1_000_000) -> i64 { units }
}

prop_compose! {
    fn errors()(v in prop::collection::vec((-100_000i64..100_000, -100_000i64..100_000), 1..60))
        -> Vec<(i64, i64)> { v }
}

proptest! {
    #[test]
    fn command_never_exceeds_limit(
        kp in gain(),
        ki in gain(),
        limit in 0i32..1000,
        anti_windup in any::<bool>(),
        steps in errors(),
    ) {
        let mut c = controller(kp, ki, limit, anti_windup);
        for (target, measured) in steps {
            let cmd = c.compute_command(Decimal::ZERO, target, measured);
            prop_assert!(cmd.abs() <= limit, "cmd {} limit {}", cmd, limit);
        }
    }

    #[test]
    fn proportional_saturation_never_integrates(
        kp in gain(),
        ki in gain(),
        limit in 0i32..100,
        steps in errors(),
    ) {
        let mut c = controller(kp, ki, limit, true);
        for (target, measured) in steps {
            let error = target - measured;
            let p = Decimal::new(i128::from(kp), 4).mul_int(error).trunc();
            let before = c.accumulator();
            let cmd = c.compute_command(Decimal::ZERO, target, measured);
            if p.abs() > i128::from(limit) {
                prop_assert_eq!(c.accumulator(), before);
                prop_assert_eq!(i128::from(cmd), p.signum() * i128::from(limit));
                // Same input again: still saturated, still frozen.
                let again = c.compute_command(Decimal::ZERO, target, measured);
                prop_assert_eq!(again, cmd);
                prop_assert_eq!(c.accumulator(), before);
            }
        }
    }

    #[test]
    fn without_anti_windup_accumulator_moves_by_error(
        kp in gain(),
        ki in gain(),
        limit in 0i32..1000,
        steps in errors(),
    ) {
        let mut c = controller(kp, ki, limit, false);
        for (target, measured) in steps {
            let before = c.accumulator();
            c.compute_command(Decimal::ZERO, target, measured);
            prop_assert_eq!(c.accumulator(), before + (target - measured));
        }
    }

    #[test]
    fn reset_then_zero_error_is_quiet(
        kp in gain(),
        ki in gain(),
        limit in 0i32..1000,
        anti_windup in any::<bool>(),
        steps in errors(),
        position in -100_000i64..100_000,
    ) {
        let mut c = controller(kp, ki, limit, anti_windup);
        for (target, measured) in steps {
            c.compute_command(Decimal::ZERO, target, measured);
        }
        c.reset();
        prop_assert_eq!(c.accumulator(), 0);
        prop_assert_eq!(c.compute_command(Decimal::ZERO, position, position), 0);
        prop_assert_eq!(c.accumulator(), 0);
    }

    #[test]
    fn quadrature_count_is_forward_minus_reverse(
        edges in prop::collection::vec(any::<bool>(), 0..2000),
    ) {
        let mut counter = PulseCounter::new();
        for &lagging_high in &edges {
            counter.on_edge(lagging_high);
        }
        let reverse = edges.iter().filter(|&&h| h).count() as i64;
        let forward = edges.len() as i64 - reverse;
        prop_assert_eq!(counter.value(), forward - reverse);
    }
}
