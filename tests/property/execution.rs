// tests/property/execution.rs

#[path = "../common/mod.rs"]
mod common;
use crate::common::{fake_task, graph_with, mock_project, runner_for, FakeTransform};

use std::collections::BTreeMap;

use proptest::prelude::*;

use assetflow::engine::{CoreCommand, CoreRuntime, RuntimeEvent, TaskOutcome, TriggerReason};
use assetflow::graph::Composition;
use assetflow::runner::TaskStatus;

#[derive(Debug, Clone)]
enum Op {
    Trigger(usize),
    Complete(usize),
}

fn op_strategy(tasks: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..tasks).prop_map(Op::Trigger),
        (0..tasks).prop_map(Op::Complete),
    ]
}

proptest! {
    /// Whatever order triggers and completions arrive in, a task never has
    /// two runs in flight and never more than one re-run pending.
    #[test]
    fn core_never_overlaps_runs_of_one_task(
        ops in proptest::collection::vec(op_strategy(3), 1..60)
    ) {
        let names = ["a", "b", "c"];
        let mut core = CoreRuntime::new(names);
        let mut in_flight: BTreeMap<&str, usize> = BTreeMap::new();

        for op in ops {
            let (task, event) = match op {
                Op::Trigger(i) => (names[i], RuntimeEvent::TaskTriggered {
                    task: names[i].to_string(),
                    reason: TriggerReason::FileWatch,
                }),
                Op::Complete(i) => {
                    // Completions only make sense for a run the core started.
                    if in_flight.get(names[i]).copied().unwrap_or(0) == 0 {
                        continue;
                    }
                    *in_flight.get_mut(names[i]).unwrap() -= 1;
                    (names[i], RuntimeEvent::TaskCompleted {
                        task: names[i].to_string(),
                        outcome: TaskOutcome::Succeeded,
                    })
                }
            };

            let step = core.step(event);
            prop_assert!(step.keep_running);
            prop_assert!(step.commands.len() <= 1);
            for CoreCommand::RunTask(started) in step.commands {
                prop_assert_eq!(started.as_str(), task);
                let count = in_flight.entry(task).or_insert(0);
                *count += 1;
                prop_assert_eq!(*count, 1, "second run of {} while one is in flight", task);
            }
            prop_assert_eq!(core.is_running(task), in_flight.get(task).copied().unwrap_or(0) == 1);
        }
    }

    /// A sequence of `n` tasks whose task `k` fails reports exactly the first
    /// `k + 1` tasks and never invokes the rest.
    #[test]
    fn sequence_stops_at_the_failing_task(n in 1usize..6, k_seed in any::<usize>()) {
        let k = k_seed % n;
        let names: Vec<String> = (0..n).map(|i| format!("t{i}")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let fs = mock_project(&name_refs);
        let transforms: Vec<FakeTransform> = (0..n).map(|_| FakeTransform::new()).collect();
        transforms[k].fail_on(&format!("{}.txt", names[k]));

        let tasks = names
            .iter()
            .zip(&transforms)
            .map(|(name, t)| fake_task(name, t))
            .collect();
        let graph = graph_with(tasks, vec![("build", Composition::sequence(name_refs.clone()))]);
        let mut runner = runner_for(&fs, graph);

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let report = rt.block_on(runner.execute("build")).unwrap();

        prop_assert_eq!(report.tasks.len(), k + 1);
        prop_assert!(matches!(report.tasks[k].status, TaskStatus::Failed(_)));
        for (i, t) in transforms.iter().enumerate() {
            prop_assert_eq!(t.call_count(), usize::from(i <= k));
        }
    }
}
