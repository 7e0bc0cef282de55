#![cfg(all(feature = "criterion-bench", feature = "memory-store"))]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use org_acl::{
    AclConfig, AclRegistry, EditAction, GateScope, Group, MemoryDirectory, OrgChecker, OrgName,
    Resource, User,
};
use std::hint::black_box;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    Runtime::new().unwrap()
}

fn setup_checker(rt: &Runtime, dir: &TempDir) -> Arc<OrgChecker<MemoryDirectory>> {
    let org = OrgName::try_from("bench").unwrap();
    let directory = MemoryDirectory::new();
    directory.add_user(User::new("alice"));
    directory.associate(&org, "alice");
    let config = AclConfig::new(dir.path()).gate_scope(GateScope::Organization);
    let registry = AclRegistry::new(config, directory);
    rt.block_on(registry.load_acl(&org)).unwrap()
}

fn bench_check(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("check_item_perm");
    group.sample_size(30);
    group.throughput(Throughput::Elements(1));

    let dir = TempDir::new().unwrap();
    let checker = setup_checker(&rt, &dir);
    let alice = User::new("alice");
    let node = Resource::new("nodes", "node1");
    rt.block_on(checker.edit_item_perm(&node, &alice, &["read"], EditAction::Add)).unwrap();
    rt.block_on(checker.add_members(&Group::new("users"), &[&alice])).unwrap();

    group.bench_function("specific_rule", |b| {
        b.iter(|| {
            let allowed = rt.block_on(checker.check_item_perm(&node, &alice, "read")).unwrap();
            black_box(allowed);
        });
    });

    let other = Resource::new("nodes", "node2");
    group.bench_function("general_rule", |b| {
        b.iter(|| {
            let allowed = rt.block_on(checker.check_item_perm(&other, &alice, "update")).unwrap();
            black_box(allowed);
        });
    });

    group.finish();
}

fn bench_role_depth(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("check_role_depth");
    group.sample_size(30);
    group.throughput(Throughput::Elements(1));

    for depth in [1usize, 4, 8] {
        let dir = TempDir::new().unwrap();
        let checker = setup_checker(&rt, &dir);
        let alice = User::new("alice");
        let first = Group::new("chain_0");
        rt.block_on(checker.add_members(&first, &[&alice])).unwrap();
        for i in 1..depth {
            let inner = Group::new(format!("chain_{}", i - 1));
            let outer = Group::new(format!("chain_{i}"));
            rt.block_on(checker.add_members(&outer, &[&inner])).unwrap();
        }
        let tail = Group::new(format!("chain_{}", depth - 1));
        let node = Resource::new("nodes", "node1");
        rt.block_on(checker.edit_item_perm(&node, &tail, &["read"], EditAction::Add)).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                let allowed = rt.block_on(checker.check_item_perm(&node, &alice, "read")).unwrap();
                black_box(allowed);
            });
        });
    }

    group.finish();
}

fn bench_policy_size(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("check_policy_size");
    group.sample_size(20);
    group.throughput(Throughput::Elements(1));

    for nodes in [10usize, 100, 1_000] {
        let dir = TempDir::new().unwrap();
        let checker = setup_checker(&rt, &dir);
        let alice = User::new("alice");
        for i in 0..nodes {
            let node = Resource::new("nodes", format!("node{i}"));
            rt.block_on(checker.edit_item_perm(&node, &alice, &["read"], EditAction::Add)).unwrap();
        }
        let last = Resource::new("nodes", format!("node{}", nodes - 1));

        group.bench_with_input(BenchmarkId::from_parameter(nodes), &nodes, |b, _| {
            b.iter(|| {
                let allowed = rt.block_on(checker.check_item_perm(&last, &alice, "read")).unwrap();
                black_box(allowed);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_check, bench_role_depth, bench_policy_size);
criterion_main!(benches);
