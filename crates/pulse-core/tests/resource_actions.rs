// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end orchestration: resource changes, action helpers, and the
//! payload contracts downstream listeners rely on.
#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use pulse_core::actions::{change_resource, move_player, sense_tile, stabilize_tile};
use pulse_core::registry::{
    PLAYER_ACTION_STABILIZE, PLAYER_ENERGY_CHANGED, PLAYER_STATS_UPDATED,
    SYSTEM_BALANCE_CHANGED, SYSTEM_TRANSACTION_ROLLEDBACK, TILE_CHAOS_CHANGED, TILE_EXPLORED,
};
use pulse_core::world::ResourceKind;
use pulse_dry_tests::{EventProbe, Harness};

#[test]
fn rejected_spend_leaves_zero_observable_effects() {
    let mut h = Harness::default();
    h.world.player.set_resource(ResourceKind::Energy, 3, 20);
    let resource = EventProbe::new();
    resource.subscribe(&mut h.bus, PLAYER_ENERGY_CHANGED);
    let notices = EventProbe::new();
    notices.subscribe(&mut h.bus, SYSTEM_TRANSACTION_ROLLEDBACK);

    let err = change_resource(
        &mut h.coord,
        &mut h.bus,
        &mut h.world,
        ResourceKind::Energy,
        -5,
        "test spend",
    )
    .expect_err("shortfall");

    assert_eq!(err.to_string(), "Not enough energy: have 3, need 5");
    assert!(resource.is_empty(), "the resource listener never fires");
    assert_eq!(notices.len(), 1, "exactly one rollback notification");
    assert_eq!(h.world.player.resource(ResourceKind::Energy), 3);
    assert_eq!(h.coord.live_count(), 0);
}

#[test]
fn successful_gain_reports_old_new_delta_then_stats() {
    let mut h = Harness::default();
    h.world.player.set_resource(ResourceKind::Energy, 3, 20);
    let probe = EventProbe::new();
    probe.subscribe_all(&mut h.bus, &[PLAYER_ENERGY_CHANGED, PLAYER_STATS_UPDATED]);

    let outcome = change_resource(
        &mut h.coord,
        &mut h.bus,
        &mut h.world,
        ResourceKind::Energy,
        5,
        "test gain",
    )
    .expect("gain");

    assert_eq!(
        (outcome.old_value, outcome.new_value, outcome.delta),
        (3, 8, 5)
    );
    // Declared order: resource change first, stats second, one commit.
    assert_eq!(
        probe.names(),
        vec![PLAYER_ENERGY_CHANGED.to_owned(), PLAYER_STATS_UPDATED.to_owned()]
    );
    let events = probe.events();
    let change = events[0].payload.as_resource_change().expect("resource");
    assert_eq!((change.old_value, change.new_value), (3, 8));
    assert_eq!(change.delta, Some(5));
    assert_eq!(events[0].meta.txn, events[1].meta.txn);

    let stats = events[1].payload.as_stats().expect("stats");
    assert_eq!(stats.energy, 8);
}

#[test]
fn gain_clamps_at_capacity_and_reports_the_clamped_delta() {
    let mut h = Harness::default();
    h.world.player.set_resource(ResourceKind::Energy, 18, 20);

    let outcome = change_resource(
        &mut h.coord,
        &mut h.bus,
        &mut h.world,
        ResourceKind::Energy,
        5,
        "overfill",
    )
    .expect("gain");
    assert_eq!((outcome.old_value, outcome.new_value, outcome.delta), (18, 20, 2));
}

#[test]
fn stabilize_attaches_the_combined_view_to_the_two_aggregate_events() {
    let mut h = Harness::explored(3, 3);
    let probe = EventProbe::new();
    probe.subscribe_all(
        &mut h.bus,
        &[
            TILE_CHAOS_CHANGED,
            SYSTEM_BALANCE_CHANGED,
            PLAYER_ACTION_STABILIZE,
            PLAYER_ENERGY_CHANGED,
            PLAYER_STATS_UPDATED,
        ],
    );

    let outcome = stabilize_tile(&mut h.coord, &mut h.bus, &mut h.world, 1, 1).expect("stabilize");

    // Full declared sequence, in order.
    assert_eq!(
        probe.names(),
        vec![
            TILE_CHAOS_CHANGED.to_owned(),
            SYSTEM_BALANCE_CHANGED.to_owned(),
            PLAYER_ACTION_STABILIZE.to_owned(),
            PLAYER_ENERGY_CHANGED.to_owned(),
            PLAYER_STATS_UPDATED.to_owned()
        ]
    );
    for event in probe.events() {
        let has_combined = event.meta.combined.is_some();
        let is_aggregate =
            *event.name == *PLAYER_ACTION_STABILIZE || *event.name == *PLAYER_STATS_UPDATED;
        assert_eq!(has_combined, is_aggregate, "combined view on {}", event.name);
        if let Some(view) = event.meta.combined {
            assert!((view.cell_delta - (outcome.cell_new_chaos - outcome.cell_old_chaos)).abs()
                < 1e-9);
            assert!((view.chaos + view.order - 1.0).abs() < 1e-9);
            assert!((view.chaos_delta - outcome.balance_delta).abs() < 1e-9);
        }
    }
}

#[test]
fn stabilize_keeps_legacy_listeners_in_the_loop() {
    let mut h = Harness::explored(2, 2);
    let legacy = EventProbe::new();
    legacy.subscribe_all(&mut h.bus, &["tileStabilized", "tileChaosChanged", "balanceChanged"]);

    stabilize_tile(&mut h.coord, &mut h.bus, &mut h.world, 0, 0).expect("stabilize");
    assert_eq!(
        legacy.names(),
        vec![
            "tileChaosChanged".to_owned(),
            "balanceChanged".to_owned(),
            "tileStabilized".to_owned()
        ]
    );
}

#[test]
fn balance_payload_sums_to_one_and_carries_the_scaled_delta() {
    let mut h = Harness::explored(2, 2);
    let probe = EventProbe::new();
    probe.subscribe(&mut h.bus, SYSTEM_BALANCE_CHANGED);

    stabilize_tile(&mut h.coord, &mut h.bus, &mut h.world, 0, 0).expect("stabilize");

    let event = &probe.events()[0];
    let balance = event.payload.as_balance_change().expect("balance");
    assert!((balance.chaos + balance.order - 1.0).abs() < 1e-9);
    assert!((balance.chaos_delta - (-0.02)).abs() < 1e-9);
}

#[test]
fn move_then_sense_flow_updates_world_and_emits_both_sequences() {
    let mut h = Harness::default();
    let probe = EventProbe::new();
    probe.subscribe(&mut h.bus, TILE_EXPLORED);

    move_player(&mut h.coord, &mut h.bus, &mut h.world, 0, 1).expect("move");
    let sensed = sense_tile(&mut h.coord, &mut h.bus, &mut h.world, 0, 1).expect("sense");

    assert!(sensed.newly_explored);
    assert_eq!((h.world.player.row(), h.world.player.col()), (0, 1));
    assert!(h.world.grid.cell(0, 1).expect("cell").explored);
    assert_eq!(probe.len(), 1);

    let reveal = &probe.events()[0];
    // Positional fields let UI collaborators locate the cell without
    // re-querying the grid.
    match &reveal.payload {
        pulse_core::payload::EventPayload::TileExplored(tile) => {
            assert_eq!((tile.row, tile.col), (0, 1));
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn failed_move_keeps_the_movement_points() {
    let mut h = Harness::default();
    h.world.player.set_resource(ResourceKind::Movement, 0, 5);

    let err = move_player(&mut h.coord, &mut h.bus, &mut h.world, 0, 1).expect_err("no points");
    assert_eq!(err.to_string(), "Not enough movement: have 0, need 1");
    assert_eq!((h.world.player.row(), h.world.player.col()), (0, 0));
}
