use proptest::prelude::*;

use runt::{Cancellation, Runner, TestContext, TestOutcome, TestingContext};

#[derive(Debug, Clone)]
enum Step {
    Log(String),
    Error(String),
    Subtest { fails: bool },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        "[a-z ]{0,12}".prop_map(Step::Log),
        "[a-z ]{0,12}".prop_map(Step::Error),
        any::<bool>().prop_map(|fails| Step::Subtest { fails }),
    ]
}

proptest! {
    #[test]
    fn test_logs_keep_call_order(lines in prop::collection::vec("[^\n]{0,16}", 0..16)) {
        let t = TestContext::new(Cancellation::new(), "root");
        for line in &lines {
            t.log(line);
        }
        let expected: String = lines.iter().map(|line| format!("{line}\n")).collect();
        prop_assert_eq!(t.logs(), expected);
    }

    #[test]
    fn test_failure_is_sticky_and_propagates(steps in prop::collection::vec(step(), 0..12)) {
        let t = TestContext::new(Cancellation::new(), "root");
        let mut expect_failed = false;
        for step in &steps {
            let was_failed = t.failed();
            match step {
                Step::Log(text) => t.log(text),
                Step::Error(text) => {
                    t.error(text);
                    expect_failed = true;
                }
                Step::Subtest { fails } => {
                    let fails = *fails;
                    let passed = t.run_subtest("sub", |sub| {
                        if fails {
                            sub.fail();
                        }
                    });
                    prop_assert_eq!(passed, !fails);
                    expect_failed |= fails;
                }
            }
            prop_assert!(!was_failed || t.failed());
        }
        prop_assert_eq!(t.failed(), expect_failed);
        prop_assert!(!t.skipped());
    }

    #[test]
    fn test_skip_never_reaches_ancestors(depth in 1usize..6) {
        fn nest(ctx: &TestContext<'_>, remaining: usize) {
            if remaining == 0 {
                ctx.skip_now();
            }
            ctx.run_subtest("level", |sub| nest(sub, remaining - 1));
        }

        let t = TestContext::new(Cancellation::new(), "root");
        nest(&t, depth);
        prop_assert!(!t.skipped());
        prop_assert!(!t.failed());
    }

    #[test]
    fn test_outcome_carries_root_logs(lines in prop::collection::vec("[a-z]{1,8}", 1..8)) {
        let outcome = Runner::default().run_with_outcome(Cancellation::new(), |t| {
            for line in &lines {
                t.log(line);
            }
            t.fail();
        });
        let expected: String = lines.iter().map(|line| format!("{line}\n")).collect();
        prop_assert_eq!(outcome, TestOutcome::Failed { logs: expected });
    }
}
