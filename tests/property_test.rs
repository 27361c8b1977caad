use pay_sync::domain::error::LifecycleError;
use pay_sync::domain::id::PaymentId;
use pay_sync::domain::money::MoneyAmount;
use pay_sync::domain::payment::PaymentStatus;
use proptest::prelude::*;

fn arb_status() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        Just(PaymentStatus::Pending),
        Just(PaymentStatus::Succeeded),
        Just(PaymentStatus::Canceled),
    ]
}

proptest! {
    /// Terminal states (Succeeded, Canceled) can never transition to anything.
    #[test]
    fn terminal_states_reject_all_transitions(target in arb_status()) {
        use PaymentStatus::*;
        for terminal in [Succeeded, Canceled] {
            prop_assert!(!terminal.can_transition_to(&target));
        }
    }

    /// Any random sequence of transitions starting from Pending
    /// has at most 1 valid step, since every reachable target is terminal.
    #[test]
    fn random_walk_has_at_most_one_transition(
        steps in prop::collection::vec(arb_status(), 1..20)
    ) {
        let mut current = PaymentStatus::Pending;
        let mut transitions = 0u32;
        for next in &steps {
            if current.can_transition_to(next) {
                current = *next;
                transitions += 1;
            }
        }
        prop_assert!(transitions <= 1, "got {transitions} transitions in walk: {steps:?}");
    }

    /// A status is terminal exactly when nothing can follow it.
    #[test]
    fn terminal_means_no_way_out(status in arb_status()) {
        use PaymentStatus::*;
        let has_exit = [Pending, Succeeded, Canceled]
            .iter()
            .any(|next| status.can_transition_to(next));
        prop_assert_eq!(status.is_terminal(), !has_exit);
    }

    /// as_str → from_gateway roundtrip is identity for any status.
    #[test]
    fn status_roundtrip(status in arb_status()) {
        prop_assert_eq!(PaymentStatus::from_gateway(status.as_str()).unwrap(), status);
    }

    /// Anything outside the three known strings is a protocol violation.
    #[test]
    fn unknown_statuses_are_protocol_violations(raw in "[a-z_]{1,24}") {
        prop_assume!(!matches!(raw.as_str(), "pending" | "succeeded" | "canceled"));
        prop_assert!(matches!(
            PaymentStatus::from_gateway(&raw),
            Err(LifecycleError::ProtocolViolation(_))
        ));
    }

    /// Gateway decimal strings survive parse → format.
    #[test]
    fn decimal_amount_roundtrip(minor in 0i64..=i64::MAX / 100) {
        let amount = MoneyAmount::new(minor).unwrap();
        let parsed = MoneyAmount::from_decimal_str(&amount.to_decimal_string()).unwrap();
        prop_assert_eq!(parsed.minor_units(), minor);
    }

    /// More than two fractional digits is never silently truncated.
    #[test]
    fn excess_precision_is_rejected(whole in 0u32..1_000_000, frac in 100u32..1000) {
        let input = format!("{whole}.{frac}");
        prop_assert!(MoneyAmount::from_decimal_str(&input).is_err());
    }

    /// Payment ids accept the gateway alphabet and reject everything else.
    #[test]
    fn payment_id_alphabet(id in "[A-Za-z0-9_-]{1,64}", bad in "[^A-Za-z0-9_-]") {
        prop_assert!(PaymentId::new(id.clone()).is_ok());
        let input = format!("{id}{bad}");
        prop_assert!(PaymentId::new(input).is_err());
    }
}
