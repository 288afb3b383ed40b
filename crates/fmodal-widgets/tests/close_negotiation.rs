use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use fmodal_core::CloseTrigger;
use fmodal_runtime::{DeferredQueue, ManualClock, RegistryConfig};
use fmodal_widgets::{CloseOutcome, ModalCallbacks, ModalProps, ModalRegistry, create_modal_adapter};

/// Registry whose adapter installs the listener carried in the options and
/// renders "is the content visible".
type Registry = ModalRegistry<&'static str, ModalCallbacks, bool>;

fn registry() -> (Registry, ManualClock) {
    let clock = ManualClock::new();
    let adapter = create_modal_adapter(|props: ModalProps<'_, &'static str, ModalCallbacks>| {
        if let Some(registration) = props.context.use_callbacks(props.options) {
            registration.detach();
        }
        props.is_open
    });
    let registry = ModalRegistry::with_scheduler(
        adapter,
        RegistryConfig::default(),
        DeferredQueue::with_clock(clock.clone()),
    );
    (registry, clock)
}

fn visible(registry: &Registry) -> Vec<bool> {
    registry.render().into_iter().map(|r| r.output).collect()
}

#[test]
fn no_listener_closes_on_any_trigger() {
    let (registry, _clock) = registry();
    for trigger in CloseTrigger::ALL {
        let handle = registry.open("plain", ModalCallbacks::new());
        registry.render();

        assert_eq!(handle.close_with(trigger), CloseOutcome::Closed);
        assert_eq!(handle.is_open(), Some(false), "trigger = {trigger}");
    }
}

#[test]
fn always_veto_never_closes_but_force_close_does() {
    let (registry, _clock) = registry();
    let callbacks = ModalCallbacks::new().on_before_close(|event, _force| event.prevent_default());
    let handle = registry.open("stubborn", callbacks);
    registry.render();

    for _ in 0..3 {
        for trigger in CloseTrigger::ALL {
            assert_eq!(handle.close_with(trigger), CloseOutcome::Vetoed);
        }
    }
    assert_eq!(handle.is_open(), Some(true));

    assert_eq!(handle.force_close(), CloseOutcome::Closed);
    assert_eq!(handle.is_open(), Some(false));
}

#[test]
fn dismissals_vetoed_button_honored() {
    let (registry, _clock) = registry();
    let callbacks = ModalCallbacks::new().on_before_close(|event, _force| {
        if matches!(event.trigger(), CloseTrigger::ClickOutside | CloseTrigger::Esc) {
            event.prevent_default();
        }
    });
    let handle = registry.open("form", callbacks);
    registry.render();

    assert_eq!(
        handle.close_with(CloseTrigger::ClickOutside),
        CloseOutcome::Vetoed
    );
    assert_eq!(handle.close_with(CloseTrigger::Esc), CloseOutcome::Vetoed);
    assert_eq!(visible(&registry), vec![true]);

    assert_eq!(handle.close_with(CloseTrigger::Button), CloseOutcome::Closed);
    assert_eq!(visible(&registry), vec![false]);
}

#[test]
fn second_escape_force_closes() {
    let (registry, _clock) = registry();
    let attempts = Rc::new(Cell::new(0));
    let seen = Rc::clone(&attempts);
    let callbacks = ModalCallbacks::new().on_before_close(move |event, force| {
        event.prevent_default();
        seen.set(seen.get() + 1);
        if event.trigger() == CloseTrigger::Esc && seen.get() >= 2 {
            assert_eq!(force.force_close(), CloseOutcome::Closed);
        }
    });
    let handle = registry.open("confirm", callbacks);
    registry.render();

    assert_eq!(handle.close_with(CloseTrigger::Esc), CloseOutcome::Vetoed);
    assert_eq!(handle.is_open(), Some(true));

    assert_eq!(handle.close_with(CloseTrigger::Esc), CloseOutcome::Closed);
    assert_eq!(handle.is_open(), Some(false));
    assert_eq!(attempts.get(), 2);
}

#[test]
fn record_lingers_until_grace_delay() {
    let (registry, clock) = registry();
    let handle = registry.open("bye", ModalCallbacks::new());
    registry.render();
    handle.close();

    assert_eq!(visible(&registry), vec![false], "exit render");
    assert_eq!(visible(&registry), Vec::<bool>::new(), "excluded after cleanup mark");
    assert_eq!(handle.close(), CloseOutcome::AlreadyClosed);
    assert_eq!(handle.force_close(), CloseOutcome::AlreadyClosed);

    clock.advance(registry.config().grace_delay);
    registry.tick();

    assert!(!registry.contains(handle.id()));
    assert_eq!(handle.close(), CloseOutcome::Missing);
    assert_eq!(handle.force_close(), CloseOutcome::Missing);
    assert!(registry.render().is_empty());
}

#[test]
fn force_close_twice_matches_once() {
    let (registry, clock) = registry();
    let once = registry.open("a", ModalCallbacks::new());
    let twice = registry.open("b", ModalCallbacks::new());
    registry.render();

    once.force_close();
    twice.force_close();
    twice.force_close();

    assert_eq!(once.is_open(), twice.is_open());
    assert_eq!(registry.scheduler().pending(), 2, "one eviction each");

    clock.advance_ms(500);
    assert_eq!(registry.tick(), 2);
    assert!(registry.is_empty());
}

#[test]
fn same_tick_opens_are_independent() {
    let (registry, _clock) = registry();
    let first = registry.open("one", ModalCallbacks::new());
    let second = registry.open("two", ModalCallbacks::new());
    assert_ne!(first.id(), second.id());
    registry.render();

    first.close();
    assert_eq!(first.is_open(), Some(false));
    assert_eq!(second.is_open(), Some(true));
    assert_eq!(visible(&registry), vec![false, true]);
}

#[test]
fn listener_may_open_another_modal() {
    let (registry, _clock) = registry();
    let nested = registry.clone();
    let opened = Rc::new(Cell::new(None));
    let slot = Rc::clone(&opened);
    let callbacks = ModalCallbacks::new().on_before_close(move |event, _force| {
        event.prevent_default();
        let confirm = nested.open("are you sure?", ModalCallbacks::new());
        slot.set(Some(confirm.id()));
    });
    let handle = registry.open("editor", callbacks);
    registry.render();

    assert_eq!(handle.close(), CloseOutcome::Vetoed);
    let confirm = opened.get().expect("confirmation opened");
    assert!(registry.contains(confirm));
    assert_eq!(registry.len(), 2);
}

#[test]
fn replaced_listener_token_is_inert() {
    let (registry, _clock) = registry();
    let handle = registry.open("x", ModalCallbacks::new());
    let renders = Rc::new(Cell::new(0));
    let counter = Rc::clone(&renders);
    let grab = create_modal_adapter(move |props: ModalProps<'_, &'static str, ModalCallbacks>| {
        let first = props
            .context
            .register_before_close(|event, _force| event.prevent_default());
        let second = props.context.register_before_close(|_event, _force| {});
        assert!(!first.is_active());
        assert!(second.is_active());
        drop(first);
        assert!(second.is_active(), "dropping the stale token keeps the new listener");
        second.detach();
        counter.set(counter.get() + 1);
        props.is_open
    });
    let other = registry.open_with(grab, "y", ModalCallbacks::new());
    registry.render();

    assert_eq!(renders.get(), 1);
    assert_eq!(other.close(), CloseOutcome::Closed, "second listener does not veto");
    assert_eq!(handle.close(), CloseOutcome::Closed);
}

#[test]
fn dropped_registration_removes_listener() {
    let (registry, _clock) = registry();
    let adapter = create_modal_adapter(|props: ModalProps<'_, &'static str, ModalCallbacks>| {
        let registration = props
            .context
            .register_before_close(|event, _force| event.prevent_default());
        assert!(registration.is_active());
        props.is_open
    });
    let handle = registry.open_with(adapter, "transient", ModalCallbacks::new());
    registry.render();

    assert_eq!(handle.close(), CloseOutcome::Closed);
}

#[test]
fn panicking_listener_leaves_modal_open() {
    let (registry, _clock) = registry();
    let callbacks = ModalCallbacks::new().on_before_close(|event, _force| {
        if event.trigger() == CloseTrigger::Esc {
            panic!("confirmation failed");
        }
    });
    let handle = registry.open("draft", callbacks);
    registry.render();

    let attempt = catch_unwind(AssertUnwindSafe(|| handle.close_with(CloseTrigger::Esc)));
    assert!(attempt.is_err());
    assert_eq!(handle.is_open(), Some(true));
    assert_eq!(registry.scheduler().pending(), 0);
    assert_eq!(visible(&registry), vec![true]);

    assert_eq!(handle.close(), CloseOutcome::Closed);
    assert_eq!(handle.is_open(), Some(false));
}

#[test]
fn render_recovers_after_adapter_panic() {
    let clock = ManualClock::new();
    let armed = Rc::new(Cell::new(true));
    let trip = Rc::clone(&armed);
    let adapter = create_modal_adapter(move |props: ModalProps<'_, &'static str, ModalCallbacks>| {
        if *props.children == "fragile" && trip.replace(false) {
            panic!("adapter failed");
        }
        props.is_open
    });
    let registry: Registry = ModalRegistry::with_scheduler(
        adapter,
        RegistryConfig::default(),
        DeferredQueue::with_clock(clock),
    );
    let steady = registry.open("steady", ModalCallbacks::new());
    let fragile = registry.open("fragile", ModalCallbacks::new());

    assert!(catch_unwind(AssertUnwindSafe(|| registry.render())).is_err());
    assert!(!steady.is_ready(), "effects skipped for the failed pass");
    assert!(!fragile.is_ready());

    assert_eq!(visible(&registry), vec![true, true]);
    assert!(steady.is_ready());
    assert_eq!(fragile.close(), CloseOutcome::Closed);
    assert_eq!(visible(&registry), vec![true, false]);
}

#[test]
fn eviction_after_registry_drop_is_noop() {
    let clock = ManualClock::new();
    let queue = DeferredQueue::with_clock(clock.clone());
    let registry: Registry = ModalRegistry::with_scheduler(
        create_modal_adapter(|props: ModalProps<'_, &'static str, ModalCallbacks>| props.is_open),
        RegistryConfig::default(),
        queue.clone(),
    );
    let handle = registry.open("x", ModalCallbacks::new());
    registry.render();
    handle.close();

    drop(registry);
    clock.advance_ms(1_000);
    assert_eq!(queue.run_due(), 0);
    assert_eq!(handle.is_open(), None);
}
