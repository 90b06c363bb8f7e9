use glam::Vec2;
use vesper_gameplay::{
    ControlState, EventQueue, GameplayEvent, GameplayEventKind, InputSession,
};
use vesper_input::{ActionValue, Delivery, DisablePolicy, InputConfig, Phase, PhysicalInput};
use winit::keyboard::KeyCode;

fn start(config: InputConfig) -> (InputSession, EventQueue) {
    let session = InputSession::from_config(&config).unwrap();
    let queue = EventQueue::new();
    session.subscribe_all(queue.listener());
    (session, queue)
}

fn session() -> (InputSession, EventQueue) {
    start(InputConfig::default())
}

fn press(code: KeyCode) -> PhysicalInput {
    PhysicalInput::Key {
        code,
        pressed: true,
    }
}

fn release(code: KeyCode) -> PhysicalInput {
    PhysicalInput::Key {
        code,
        pressed: false,
    }
}

fn button(pressed: bool) -> ActionValue {
    ActionValue::Button(pressed)
}

#[test]
fn pause_started_publishes_once_and_swaps_modes() {
    let (mut session, queue) = session();

    session
        .inject("Player", "Pause", Phase::Started, button(true))
        .unwrap();

    assert_eq!(queue.drain(), [GameplayEvent::Pause]);
    assert!(!session.is_enabled(session.player()));
    assert!(session.is_enabled(session.ui()));
    assert_eq!(session.state(), ControlState::Paused);
}

#[test]
fn jump_is_dropped_while_paused() {
    let (mut session, queue) = session();
    session
        .inject("Player", "Pause", Phase::Started, button(true))
        .unwrap();
    queue.drain();

    let delivery = session
        .inject("Player", "Jump", Phase::Performed, button(true))
        .unwrap();

    assert_eq!(delivery, Delivery::Dropped);
    assert!(queue.is_empty());
}

#[test]
fn movement_performed_is_forwarded_exactly_once() {
    let (mut session, queue) = session();

    session
        .inject(
            "Player",
            "Movement",
            Phase::Performed,
            ActionValue::Vector2(Vec2::new(0.7, -0.3)),
        )
        .unwrap();

    assert_eq!(
        queue.drain(),
        [GameplayEvent::Movement(Vec2::new(0.7, -0.3))]
    );
}

#[test]
fn sprint_performed_then_canceled() {
    let (mut session, queue) = session();

    session
        .inject("Player", "Sprint", Phase::Performed, button(true))
        .unwrap();
    session
        .inject("Player", "Sprint", Phase::Canceled, button(false))
        .unwrap();

    assert_eq!(
        queue.drain(),
        [GameplayEvent::SprintStart, GameplayEvent::SprintEnd]
    );
}

#[test]
fn pause_then_resume_restores_initial_flags() {
    let (mut session, queue) = session();
    let initial = session.router().enabled_modes();

    session
        .inject("Player", "Pause", Phase::Started, button(true))
        .unwrap();
    session
        .inject("UI", "Resume", Phase::Started, button(true))
        .unwrap();

    assert_eq!(session.router().enabled_modes(), initial);
    assert_eq!(session.state(), ControlState::Gameplay);
    assert_eq!(
        queue.drain(),
        [GameplayEvent::Pause, GameplayEvent::Resume]
    );
}

#[test]
fn registering_adapter_twice_delivers_once() {
    let (mut session, queue) = session();
    let handler = session.handler();
    let player = session.player();

    assert!(!session.router_mut().add_callbacks(player, &handler));
    session
        .inject("Player", "Jump", Phase::Performed, button(true))
        .unwrap();

    assert_eq!(queue.drain(), [GameplayEvent::Jump]);
}

#[test]
fn kind_listeners_only_hear_their_kind() {
    let (mut session, _all) = session();
    let jumps = EventQueue::new();
    session.subscribe(GameplayEventKind::Jump, jumps.listener());

    session
        .inject("Player", "Interact", Phase::Performed, button(true))
        .unwrap();
    session
        .inject("Player", "Jump", Phase::Performed, button(true))
        .unwrap();

    assert_eq!(jumps.drain(), [GameplayEvent::Jump]);
}

#[test]
fn wasd_composite_is_normalized_and_cancels_to_zero() {
    let (mut session, queue) = session();

    session.feed(&press(KeyCode::KeyW));
    session.feed(&press(KeyCode::KeyD));
    session.feed(&release(KeyCode::KeyW));
    session.feed(&release(KeyCode::KeyD));

    let moves: Vec<Vec2> = queue
        .drain()
        .into_iter()
        .map(|event| match event {
            GameplayEvent::Movement(v) => v,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    let expected = [
        Vec2::Y,
        Vec2::new(1.0, 1.0).normalize(),
        Vec2::X,
        Vec2::ZERO,
    ];

    assert_eq!(moves.len(), expected.len());
    for (got, want) in moves.iter().zip(expected) {
        assert!(got.abs_diff_eq(want, 1e-6), "{got} != {want}");
    }
    assert!(moves[1].length() <= 1.0 + 1e-6);
}

#[test]
fn escape_toggles_once_per_press() {
    let (mut session, queue) = session();

    session.feed(&press(KeyCode::Escape));
    assert_eq!(session.state(), ControlState::Paused);
    session.feed(&release(KeyCode::Escape));
    assert_eq!(session.state(), ControlState::Paused);

    session.feed(&press(KeyCode::Escape));
    assert_eq!(session.state(), ControlState::Gameplay);
    session.feed(&release(KeyCode::Escape));

    assert_eq!(
        queue.drain(),
        [GameplayEvent::Pause, GameplayEvent::Resume]
    );
    assert!(session.is_enabled(session.player()));
    assert!(!session.is_enabled(session.ui()));
}

#[test]
fn pausing_mid_sprint_ends_sprint() {
    let (mut session, queue) = session();

    session.feed(&press(KeyCode::ShiftLeft));
    session.feed(&press(KeyCode::Escape));
    session.feed(&release(KeyCode::ShiftLeft));

    assert_eq!(
        queue.drain(),
        [
            GameplayEvent::SprintStart,
            GameplayEvent::Pause,
            GameplayEvent::SprintEnd,
        ]
    );
}

#[test]
fn truncate_policy_pauses_without_sprint_end() {
    let (mut session, queue) = start(InputConfig {
        disable_policy: DisablePolicy::Truncate,
        ..InputConfig::default()
    });

    session.feed(&press(KeyCode::ShiftLeft));
    session.feed(&press(KeyCode::Escape));
    session.feed(&release(KeyCode::ShiftLeft));

    assert_eq!(
        queue.drain(),
        [GameplayEvent::SprintStart, GameplayEvent::Pause]
    );
}

#[test]
fn mouse_look_cancels_after_a_still_frame() {
    let (mut session, queue) = session();

    session.feed(&PhysicalInput::MouseDelta(Vec2::new(4.0, -2.0)));
    session.end_frame();
    session.end_frame();

    assert_eq!(
        queue.drain(),
        [
            GameplayEvent::Look(Vec2::new(4.0, -2.0)),
            GameplayEvent::Look(Vec2::ZERO),
        ]
    );
}

#[test]
fn each_mouse_delta_is_published_once() {
    let (mut session, queue) = session();

    session.feed(&PhysicalInput::MouseDelta(Vec2::new(4.0, -2.0)));
    session.feed(&PhysicalInput::MouseDelta(Vec2::new(1.0, 1.0)));

    let looks: Vec<Vec2> = queue
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            GameplayEvent::Look(v) => Some(v),
            _ => None,
        })
        .collect();

    assert_eq!(looks, [Vec2::new(4.0, -2.0), Vec2::new(1.0, 1.0)]);
    assert_eq!(looks.iter().sum::<Vec2>(), Vec2::new(5.0, -1.0));
}

#[test]
fn keyboard_scheme_still_resolves_keys() {
    let (mut session, queue) = start(InputConfig {
        control_scheme: Some("Keyboard".to_string()),
        ..InputConfig::default()
    });

    session.feed(&press(KeyCode::Space));
    assert_eq!(queue.drain(), [GameplayEvent::Jump]);
}

#[test]
fn drop_runs_the_same_teardown_as_stop() {
    let (mut session, queue) = session();
    session.feed(&press(KeyCode::ShiftLeft));

    drop(session);

    assert_eq!(
        queue.drain(),
        [GameplayEvent::SprintStart, GameplayEvent::SprintEnd]
    );
}

#[test]
fn stop_mid_sprint_still_reports_sprint_end() {
    let (mut session, queue) = session();
    session.feed(&press(KeyCode::ShiftRight));

    session.stop();

    assert_eq!(
        queue.drain(),
        [GameplayEvent::SprintStart, GameplayEvent::SprintEnd]
    );
    assert!(session.router().leak_check().is_empty());
}
