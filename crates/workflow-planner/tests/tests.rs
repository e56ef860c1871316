use std::collections::BTreeMap;

use rand::prelude::*;
use rand_pcg::Pcg64;

use workflow_planner::audit::AuditLog;
use workflow_planner::cluster::ClusteringPolicy;
use workflow_planner::config::PlannerConfig;
use workflow_planner::cost_model::CostModel;
use workflow_planner::dag::DAG;
use workflow_planner::error::PlanningError;
use workflow_planner::file_item::FileType;
use workflow_planner::plan_stats::PlanStats;
use workflow_planner::planner::{Plan, Planner, PlannerState, PlanningRun};
use workflow_planner::planners::heft::HeftPlanner;
use workflow_planner::planners::pch::PchPlanner;
use workflow_planner::rank::calc_ranks;
use workflow_planner::vm::{vms_from_yaml_str, Vm};

const EPSILON: f64 = 1e-9;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn assert_float_eq(x: f64, y: f64) {
    assert!((x - y).abs() < EPSILON, "Values do not match: {:.15} vs {:.15}", x, y);
}

fn diamond() -> DAG {
    let mut dag = DAG::new();
    let a = dag.add_task("A", 100., 1);
    let b = dag.add_task("B", 50., 1);
    let c = dag.add_task("C", 50., 1);
    let d = dag.add_task("D", 100., 1);
    dag.add_dependency(a, b).unwrap();
    dag.add_dependency(a, c).unwrap();
    dag.add_dependency(b, d).unwrap();
    dag.add_dependency(c, d).unwrap();
    dag
}

fn gen_dag(rng: &mut Pcg64, num_tasks: usize, num_edges: usize, max_pes: u32) -> DAG {
    let mut dag = DAG::new();
    for i in 0..num_tasks {
        dag.add_task(
            &i.to_string(),
            rng.gen_range(1..10_000) as f64,
            rng.gen_range(1..max_pes + 1),
        );
    }

    let mut tasks_topsort: Vec<usize> = (0..num_tasks).collect();
    for i in 0..num_tasks {
        tasks_topsort.swap(i, rng.gen_range(0..i + 1));
    }

    for i in 0..num_edges {
        let x = rng.gen_range(0..num_tasks);
        let y = rng.gen_range(0..num_tasks);
        if x == y {
            continue;
        }
        let parent = tasks_topsort[x.min(y)];
        let child = tasks_topsort[x.max(y)];
        // some edges carry no data
        if rng.gen_range(0..4) != 0 {
            let name = format!("f{}", i);
            let size = rng.gen_range(1..50_000_000);
            dag.add_file(parent, &name, size, FileType::Output).unwrap();
            dag.add_file(child, &name, size, FileType::Input).unwrap();
        }
        dag.add_dependency(parent, child).unwrap();
    }
    dag
}

fn gen_vms(rng: &mut Pcg64, num_vms: usize, max_pes: u32) -> Vec<Vm> {
    (0..num_vms)
        .map(|i| {
            let pes = if i == 0 { max_pes } else { rng.gen_range(1..max_pes + 1) };
            Vm::new(i as u32, rng.gen_range(100..2000) as f64, pes, rng.gen_range(10..1000) as f64)
                .with_owner(rng.gen_range(0..3))
                .with_price(rng.gen_range(0.1..2.))
        })
        .collect()
}

/// Checks every property a valid plan must have. VM ids must equal their positions in the pool.
fn check_plan(plan: &Plan, dag: &DAG, vms: &[Vm]) {
    let costs = CostModel::new(dag, vms).unwrap();

    assert_eq!(plan.assignments.len(), dag.task_count());
    for (task, assignment) in plan.assignments.iter().enumerate() {
        assert_eq!(assignment.task, task);
        let vm = &vms[assignment.vm as usize];
        assert!(vm.pes >= dag.get_task(task).pes);
        assert_eq!(assignment.owner, vm.owner);
        assert_float_eq(
            assignment.finish_time - assignment.start_time,
            costs.computation_cost(task, assignment.vm as usize),
        );
    }

    for task in dag.get_tasks() {
        let child = plan.assignment(task.id);
        for &parent in task.parents() {
            let parent = plan.assignment(parent);
            let mut ready_time = parent.finish_time;
            if parent.vm != child.vm {
                ready_time += costs.transfer_cost(parent.task, child.task);
            }
            assert!(
                child.start_time >= ready_time - EPSILON,
                "task {} starts at {} before its input from {} is ready at {}",
                child.task,
                child.start_time,
                parent.task,
                ready_time
            );
        }
    }

    let mut by_vm: BTreeMap<u32, Vec<(f64, f64)>> = BTreeMap::new();
    for assignment in plan.assignments.iter() {
        by_vm
            .entry(assignment.vm)
            .or_default()
            .push((assignment.start_time, assignment.finish_time));
    }
    for intervals in by_vm.values_mut() {
        intervals.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for pair in intervals.windows(2) {
            assert!(pair[0].1 <= pair[1].0 + EPSILON, "overlapping reservations {:?}", pair);
        }
    }

    let makespan = plan.assignments.iter().map(|a| a.finish_time).fold(0., f64::max);
    assert_float_eq(plan.makespan, makespan);

    let mut covered = plan.clusters.iter().flatten().copied().collect::<Vec<_>>();
    covered.sort();
    assert_eq!(covered, (0..dag.task_count()).collect::<Vec<_>>());
    for cluster in plan.clusters.iter() {
        let vm = plan.assignment(cluster[0]).vm;
        assert!(cluster.iter().all(|&task| plan.assignment(task).vm == vm));
    }
}

#[test]
fn diamond_on_single_vm() {
    init_logger();
    let dag = diamond();
    let vms = vec![Vm::new(0, 100., 1, 100.)];

    for planner in [
        Box::new(PchPlanner::new()) as Box<dyn Planner>,
        Box::new(HeftPlanner::new()) as Box<dyn Planner>,
    ] {
        let plan = planner.plan(&dag, &vms).unwrap();
        check_plan(&plan, &dag, &vms);
        assert_eq!(plan.ranks, vec![2.5, 1.5, 1.5, 1.]);
        assert_float_eq(plan.makespan, 3.);

        let mut order = plan.assignments.clone();
        order.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        assert_eq!(order[0].task, 0);
        assert_eq!(order[3].task, 3);
        // no idle gaps
        for pair in order.windows(2) {
            assert_float_eq(pair[0].finish_time, pair[1].start_time);
        }
    }
}

#[test]
fn diamond_clusters() {
    let dag = diamond();
    let vms = vec![Vm::new(0, 100., 1, 100.)];

    let plan = PchPlanner::new().plan(&dag, &vms).unwrap();
    assert_eq!(plan.clusters, vec![vec![0, 1], vec![2, 3]]);
    let plan = HeftPlanner::new().plan(&dag, &vms).unwrap();
    assert_eq!(plan.clusters, vec![vec![0], vec![1], vec![2], vec![3]]);
}

#[test]
fn chain_avoids_transfers() {
    let mut dag = DAG::new();
    let a = dag.add_task("a", 1000., 1);
    let b = dag.add_task("b", 2000., 1);
    dag.add_file(a, "a.out", 10_000_000, FileType::Output).unwrap();
    dag.add_file(b, "a.out", 10_000_000, FileType::Input).unwrap();
    dag.add_dependency(a, b).unwrap();
    let vms = vec![Vm::new(0, 1000., 1, 100.), Vm::new(1, 500., 2, 100.)];

    let plan = PchPlanner::new().plan(&dag, &vms).unwrap();
    check_plan(&plan, &dag, &vms);
    assert_eq!(plan.assignment(a).vm, 0);
    assert_eq!(plan.assignment(b).vm, 0);
    assert_float_eq(plan.makespan, 3.);
}

#[test]
fn infeasible_task() {
    init_logger();
    let mut dag = DAG::new();
    let a = dag.add_task("a", 100., 1);
    let b = dag.add_task("b", 100., 4);
    dag.add_dependency(a, b).unwrap();
    let vms = vec![Vm::new(0, 100., 2, 10.), Vm::new(1, 200., 2, 10.)];

    let mut run = PlanningRun::new(&dag, &vms, "pch".to_string(), ClusteringPolicy::Chain, true);
    assert_eq!(run.state(), PlannerState::Init);
    let result = run.run();
    assert_eq!(
        result.unwrap_err(),
        PlanningError::InfeasibleAssignment {
            task: b,
            name: "b".to_string(),
            pes: 4
        }
    );
    assert_eq!(run.state(), PlannerState::Scheduling);

    assert!(HeftPlanner::new().plan(&dag, &vms).is_err());
    assert!(dag.get_tasks().iter().all(|task| task.vm().is_none()));
    assert!(!dag.is_planned());
}

#[test]
fn cycle_is_reported() {
    let mut dag = DAG::new();
    let a = dag.add_task("a", 100., 1);
    let b = dag.add_task("b", 100., 1);
    let c = dag.add_task("c", 100., 1);
    dag.add_dependency(a, b).unwrap();
    dag.add_dependency(b, c).unwrap();
    dag.add_dependency(c, b).unwrap();
    let vms = vec![Vm::new(0, 100., 1, 10.)];

    let mut run = PlanningRun::new(&dag, &vms, "pch".to_string(), ClusteringPolicy::Chain, true);
    assert!(matches!(run.run(), Err(PlanningError::MalformedGraph(_))));
    assert_eq!(run.state(), PlannerState::CostComputed);
}

#[test]
fn invalid_vm_pool() {
    let dag = diamond();
    assert!(matches!(
        PchPlanner::new().plan(&dag, &[]),
        Err(PlanningError::InvalidVmPool(_))
    ));
    let vms = vec![Vm::new(3, 100., 1, 10.), Vm::new(3, 100., 1, 10.)];
    assert!(matches!(
        HeftPlanner::new().plan(&dag, &vms),
        Err(PlanningError::InvalidVmPool(_))
    ));
}

#[test]
fn empty_graph() {
    let dag = DAG::new();
    let plan = PchPlanner::new().plan(&dag, &[Vm::new(0, 100., 1, 10.)]).unwrap();
    assert!(plan.assignments.is_empty());
    assert_eq!(plan.makespan, 0.);
}

#[test]
fn apply_plan() {
    let mut dag = diamond();
    let vms = vec![Vm::new(5, 100., 1, 100.).with_owner(2)];

    let plan = PchPlanner::new().plan(&dag, &vms).unwrap();
    plan.apply(&mut dag).unwrap();
    assert!(dag.is_planned());
    for task in dag.get_tasks() {
        assert_eq!(task.vm(), Some(5));
        assert_eq!(task.owner(), Some(2));
    }
    assert_eq!(plan.apply(&mut dag), Err(PlanningError::AlreadyAssigned { task: 0 }));

    assert!(matches!(
        plan.apply(&mut DAG::new()),
        Err(PlanningError::MalformedGraph(_))
    ));
}

#[test]
fn planning_is_deterministic() {
    let mut rng = Pcg64::seed_from_u64(123);
    let dag = gen_dag(&mut rng, 60, 150, 4);
    let vms = gen_vms(&mut rng, 6, 4);

    for planner in [
        Box::new(PchPlanner::new()) as Box<dyn Planner>,
        Box::new(HeftPlanner::new().with_insertion(false)) as Box<dyn Planner>,
    ] {
        let first = planner.plan(&dag, &vms).unwrap();
        let second = planner.plan(&dag, &vms).unwrap();
        assert_eq!(first.assignments, second.assignments);
        assert_eq!(first.clusters, second.clusters);
        assert_eq!(first.audit_log, second.audit_log);
    }
}

#[test]
fn random_dags() {
    init_logger();
    let mut rng = Pcg64::seed_from_u64(456);

    for _ in 0..30 {
        let num_tasks = rng.gen_range(1..80);
        let num_edges = rng.gen_range(0..num_tasks * 3);
        let num_vms = rng.gen_range(1..8);
        let dag = gen_dag(&mut rng, num_tasks, num_edges, 4);
        let vms = gen_vms(&mut rng, num_vms, 4);

        for insertion in [true, false] {
            let heft = HeftPlanner::new().with_insertion(insertion).plan(&dag, &vms).unwrap();
            check_plan(&heft, &dag, &vms);
            assert!(heft.clusters.iter().all(|cluster| cluster.len() == 1));

            let pch = PchPlanner::new().with_insertion(insertion).plan(&dag, &vms).unwrap();
            check_plan(&pch, &dag, &vms);
            assert_eq!(heft.ranks, pch.ranks);
        }

        let costs = CostModel::new(&dag, &vms).unwrap();
        let ranks = calc_ranks(&dag, &costs).unwrap();
        for task in dag.get_tasks() {
            for &child in task.children() {
                assert!(ranks[task.id] >= costs.transfer_cost(task.id, child) + ranks[child]);
            }
        }
    }
}

#[test]
fn append_only_reservations() {
    let mut rng = Pcg64::seed_from_u64(789);
    let dag = gen_dag(&mut rng, 50, 100, 2);
    let vms = gen_vms(&mut rng, 4, 2);

    let plan = PchPlanner::new().with_insertion(false).plan(&dag, &vms).unwrap();
    let mut last_finish: BTreeMap<u32, f64> = BTreeMap::new();
    for record in plan.audit_log.iter() {
        let last = last_finish.entry(record.vm).or_insert(0.);
        assert!(record.start_time >= *last - EPSILON);
        *last = record.finish_time;
    }
}

#[test]
fn audit_log_export() {
    let dag = diamond();
    let vms = vec![Vm::new(0, 100., 1, 100.), Vm::new(1, 50., 1, 100.).with_owner(1)];

    let plan = PchPlanner::new().plan(&dag, &vms).unwrap();
    assert_eq!(plan.audit_log.len(), dag.task_count());
    let json = plan.audit(&dag, &vms).to_json().unwrap();
    let log: AuditLog = serde_json::from_str(&json).unwrap();
    assert_eq!(log.records, plan.audit_log);
    assert_eq!(log.tasks.len(), 4);
    assert_eq!(log.tasks[3].parents, vec![1, 2]);
    assert_eq!(log.vms.len(), 2);
    assert_eq!(log.vms[1].owner, 1);
}

#[test]
fn configured_planning() {
    let vms = vms_from_yaml_str(
        r#"
vms:
  - id: 0
    speed: 100
    pes: 1
    bandwidth: 100
    price: 0.5
  - id: 1
    speed: 50
    pes: 1
    bandwidth: 100
    price: 0.2
"#,
    )
    .unwrap();
    let config = PlannerConfig::from_yaml_str("planner: Heft[insertion=false]\npricing_interval: 2\n").unwrap();
    let planner = config.make_planner().unwrap();
    assert_eq!(planner.name(), "heft");

    let dag = diamond();
    let plan = planner.plan(&dag, &vms).unwrap();
    check_plan(&plan, &dag, &vms);

    let stats = PlanStats::new(&plan, &vms, config.pricing_interval);
    assert_float_eq(stats.makespan, plan.makespan);
    assert_float_eq(stats.total_task_time, plan.assignments.iter().map(|a| a.finish_time - a.start_time).sum());
    assert!(stats.used_vm_count >= 1);
    assert!(stats.total_cost > 0.);
}

#[test]
fn deep_chain_is_planned() {
    let n = 100_000;
    let mut dag = DAG::new();
    for i in 0..n {
        dag.add_task(&i.to_string(), 1., 1);
    }
    for i in 1..n {
        dag.add_dependency(i - 1, i).unwrap();
    }
    let vms = vec![Vm::new(0, 1., 1, 10.)];

    let plan = PchPlanner::new().plan(&dag, &vms).unwrap();
    assert_eq!(plan.clusters.len(), 1);
    assert_eq!(plan.assignments.len(), n);
    assert_float_eq(plan.makespan, n as f64);
    assert_float_eq(plan.ranks[0], n as f64);
}

#[test]
fn invalid_task_length() {
    let vms = vec![Vm::new(0, 100., 1, 10.)];
    for length in [-100., f64::NAN] {
        let mut dag = DAG::new();
        let a = dag.add_task("a", length, 1);
        let b = dag.add_task("b", 100., 1);
        dag.add_dependency(a, b).unwrap();
        assert!(matches!(
            PchPlanner::new().plan(&dag, &vms),
            Err(PlanningError::MalformedGraph(_))
        ));
        assert!(matches!(
            HeftPlanner::new().plan(&dag, &vms),
            Err(PlanningError::MalformedGraph(_))
        ));
    }
}

#[test]
fn run_cannot_be_restarted() {
    let dag = diamond();
    let vms = vec![Vm::new(0, 100., 1, 100.)];

    let mut run = PlanningRun::new(&dag, &vms, "heft".to_string(), ClusteringPolicy::Single, true);
    let plan = run.run().unwrap();
    assert_float_eq(plan.makespan, 3.);
    assert_eq!(run.state(), PlannerState::Done);
    assert_eq!(run.run().unwrap_err(), PlanningError::RunAlreadyStarted);
    assert_eq!(run.state(), PlannerState::Done);
}
