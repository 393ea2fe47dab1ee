//=========================================================================
// Timer System
//=========================================================================
//
// Per-stage delayed and repeating callbacks on a speed-scaled clock.
//
// Each update() advances the clock by one nominal tick multiplied by the
// speed, so a stage running at half speed sees its timers take twice as
// many ticks to fire, and speed 0 freezes them.
//
// Timers due in the same update fire in (deadline, scheduling order).
// A repeating timer fires at most once per update.
//
// Callbacks get the timer system back through their context, so they can
// schedule follow-ups or cancel timers (their own included). A callback
// is lifted out of its slot while it runs; timers scheduled from a
// callback are first considered on the next update.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

use log::debug;
use slotmap::{new_key_type, SlotMap};

//=== Internal Dependencies ===============================================

use crate::core::message::{CommandSender, Event, TimerContext};
use crate::core::scene::SceneGraph;

// Absorbs float drift from summing scaled ticks.
const DEADLINE_EPSILON: f64 = 1e-9;

//=== TimerKey ============================================================

new_key_type! {
    /// Handle to a scheduled timer.
    pub struct TimerKey;
}

//=== Timer ===============================================================

type TimerCallback<G, E> = Box<dyn FnMut(&mut TimerContext<'_, G, E>)>;

struct Timer<G: SceneGraph, E: Event> {
    deadline: f64,
    interval: Option<f64>,
    order: u64,
    // None while the callback is running.
    callback: Option<TimerCallback<G, E>>,
}

//=== TimerSystem =========================================================

/// Speed-scaled scheduler of callbacks owned by a stage.
pub struct TimerSystem<G: SceneGraph, E: Event> {
    timers: SlotMap<TimerKey, Timer<G, E>>,
    tick: f64,
    speed: f64,
    elapsed: f64,
    next_order: u64,
}

impl<G: SceneGraph, E: Event> TimerSystem<G, E> {
    //--- Construction -----------------------------------------------------

    /// Creates an empty timer system advancing `1 / tps` seconds per update.
    ///
    /// # Panics
    ///
    /// Panics if `tps <= 0.0`.
    pub fn new(tps: f64) -> Self {
        assert!(tps > 0.0, "TPS must be positive, got {}", tps);
        Self {
            timers: SlotMap::with_key(),
            tick: 1.0 / tps,
            speed: 1.0,
            elapsed: 0.0,
            next_order: 0,
        }
    }

    //--- Scheduling -------------------------------------------------------

    /// Runs `callback` once, `delay` of scaled time from now.
    pub fn after<F>(&mut self, delay: Duration, callback: F) -> TimerKey
    where
        F: FnMut(&mut TimerContext<'_, G, E>) + 'static,
    {
        self.schedule(delay.as_secs_f64(), None, Box::new(callback))
    }

    /// Runs `callback` every `interval` of scaled time until cancelled.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    pub fn every<F>(&mut self, interval: Duration, callback: F) -> TimerKey
    where
        F: FnMut(&mut TimerContext<'_, G, E>) + 'static,
    {
        assert!(!interval.is_zero(), "Repeat interval must be positive");
        let interval = interval.as_secs_f64();
        self.schedule(interval, Some(interval), Box::new(callback))
    }

    /// Cancels a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        self.timers.remove(key).is_some()
    }

    /// Whether the timer is still pending.
    pub fn is_scheduled(&self, key: TimerKey) -> bool {
        self.timers.contains_key(key)
    }

    /// Scaled seconds left until the timer fires.
    pub fn remaining(&self, key: TimerKey) -> Option<f64> {
        self.timers
            .get(key)
            .map(|t| (t.deadline - self.elapsed).max(0.0))
    }

    /// Drops every pending timer.
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    //--- Clock ------------------------------------------------------------

    /// Current speed multiplier.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Sets the speed multiplier applied to each update.
    ///
    /// # Panics
    ///
    /// Panics if `speed` is negative or not finite.
    pub fn set_speed(&mut self, speed: f64) {
        assert!(speed.is_finite() && speed >= 0.0, "Speed must be finite and non-negative, got {}", speed);
        self.speed = speed;
    }

    /// Scaled seconds this timer system has advanced.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Nominal seconds per update before scaling.
    pub fn tick_duration(&self) -> f64 {
        self.tick
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Returns true if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    //--- Update -----------------------------------------------------------

    /// Advances the clock by one scaled tick and fires everything due.
    ///
    /// Returns the number of callbacks invoked.
    pub fn update(&mut self, stage: &str, scene: &mut G, commands: &CommandSender<G::NodeId, E>) -> usize {
        self.elapsed += self.tick * self.speed;

        let mut due: Vec<(f64, u64, TimerKey)> = self
            .timers
            .iter()
            .filter(|(_, t)| t.deadline <= self.elapsed + DEADLINE_EPSILON)
            .map(|(key, t)| (t.deadline, t.order, key))
            .collect();

        if due.is_empty() {
            return 0;
        }

        due.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut fired = 0;
        for &(_, _, key) in &due {
            // Cancelled by an earlier callback in this update.
            let Some(mut callback) = self.timers.get_mut(key).and_then(|t| t.callback.take()) else {
                continue;
            };

            callback(&mut TimerContext::new(stage, &mut *scene, &mut *self, commands));
            fired += 1;

            // Gone if the callback cancelled itself or cleared the system.
            let Some(timer) = self.timers.get_mut(key) else {
                continue;
            };
            match timer.interval {
                Some(interval) => {
                    timer.deadline += interval;
                    timer.callback = Some(callback);
                }
                None => {
                    self.timers.remove(key);
                }
            }
        }

        debug!("Stage '{}' fired {} timer(s)", stage, fired);
        fired
    }

    //--- Internal Helpers -------------------------------------------------

    fn schedule(&mut self, delay: f64, interval: Option<f64>, callback: TimerCallback<G, E>) -> TimerKey {
        let order = self.next_order;
        self.next_order += 1;

        self.timers.insert(Timer {
            deadline: self.elapsed + delay,
            interval,
            order,
            callback: Some(callback),
        })
    }
}

//=== Tests ===============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::command_channel;
    use crate::core::scene::NodeTree;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Timers = TimerSystem<NodeTree, ()>;

    fn run(timers: &mut Timers, updates: usize) -> usize {
        let mut scene = NodeTree::new("Game");
        let (tx, _rx) = command_channel();
        (0..updates).map(|_| timers.update("Game", &mut scene, &tx)).sum()
    }

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnMut(&mut TimerContext<'_, NodeTree, ()>)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let make = move |label: &'static str| {
            let sink = Rc::clone(&sink);
            Box::new(move |_: &mut TimerContext<'_, NodeTree, ()>| sink.borrow_mut().push(label))
                as Box<dyn FnMut(&mut TimerContext<'_, NodeTree, ()>)>
        };
        (log, make)
    }

    //--- Scheduling -------------------------------------------------------

    #[test]
    fn after_fires_once_when_due() {
        let mut timers = Timers::new(10.0);
        let (log, make) = recorder();
        let key = timers.after(Duration::from_millis(300), make("a"));

        assert_eq!(run(&mut timers, 2), 0);
        assert!(timers.is_scheduled(key));

        assert_eq!(run(&mut timers, 1), 1);
        assert!(!timers.is_scheduled(key));
        assert_eq!(run(&mut timers, 5), 0);
        assert_eq!(*log.borrow(), ["a"]);
    }

    #[test]
    fn every_repeats_until_cancelled() {
        let mut timers = Timers::new(10.0);
        let (log, make) = recorder();
        let key = timers.every(Duration::from_millis(200), make("tick"));

        assert_eq!(run(&mut timers, 6), 3);
        assert!(timers.cancel(key));
        assert!(!timers.cancel(key));
        assert_eq!(run(&mut timers, 6), 0);
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn same_update_fires_by_deadline_then_order() {
        let mut timers = Timers::new(1.0);
        let (log, make) = recorder();
        timers.after(Duration::from_millis(500), make("late"));
        timers.after(Duration::from_millis(100), make("early"));
        timers.after(Duration::from_millis(500), make("late-second"));

        assert_eq!(run(&mut timers, 1), 3);
        assert_eq!(*log.borrow(), ["early", "late", "late-second"]);
    }

    #[test]
    fn clear_drops_pending_work() {
        let mut timers = Timers::new(10.0);
        let (log, make) = recorder();
        timers.after(Duration::from_millis(100), make("a"));
        timers.every(Duration::from_millis(100), make("b"));

        timers.clear();
        assert!(timers.is_empty());
        assert_eq!(run(&mut timers, 3), 0);
        assert!(log.borrow().is_empty());
    }

    //--- Speed ------------------------------------------------------------

    #[test]
    fn half_speed_doubles_ticks_needed() {
        let mut timers = Timers::new(10.0);
        timers.set_speed(0.5);
        let (_, make) = recorder();
        let key = timers.after(Duration::from_millis(200), make("a"));

        assert_eq!(run(&mut timers, 3), 0);
        assert!(timers.remaining(key).unwrap() > 0.0);
        assert_eq!(run(&mut timers, 1), 1);
    }

    #[test]
    fn zero_speed_freezes_clock() {
        let mut timers = Timers::new(10.0);
        timers.set_speed(0.0);
        let (_, make) = recorder();
        timers.after(Duration::from_millis(100), make("a"));

        assert_eq!(run(&mut timers, 50), 0);
        assert_eq!(timers.elapsed(), 0.0);
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn callbacks_can_mutate_scene() {
        let mut timers = Timers::new(10.0);
        timers.after(Duration::from_millis(100), |ctx| {
            let root = ctx.scene().root();
            ctx.scene_mut().add_child(root, "Spawned");
        });

        let mut scene = NodeTree::new("Game");
        let (tx, _rx) = command_channel();
        timers.update("Game", &mut scene, &tx);

        assert!(scene.find_by_name("Spawned").is_some());
    }

    //--- Nested Scheduling ------------------------------------------------

    #[test]
    fn callback_schedules_follow_up() {
        let mut timers = Timers::new(10.0);
        let (log, make) = recorder();
        let mut first = make("first");
        let mut second = Some(make("second"));
        timers.after(Duration::from_millis(100), move |ctx| {
            first(ctx);
            if let Some(next) = second.take() {
                ctx.timers().after(Duration::from_millis(200), next);
            }
        });

        assert_eq!(run(&mut timers, 1), 1);
        assert_eq!(timers.len(), 1);
        assert_eq!(*log.borrow(), ["first"]);

        assert_eq!(run(&mut timers, 1), 0);
        assert_eq!(run(&mut timers, 1), 1);
        assert_eq!(*log.borrow(), ["first", "second"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn repeating_timer_cancels_itself() {
        let mut timers = Timers::new(10.0);
        let count = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&count);
        let own_key: Rc<RefCell<Option<TimerKey>>> = Rc::new(RefCell::new(None));
        let key_slot = Rc::clone(&own_key);

        let key = timers.every(Duration::from_millis(100), move |ctx| {
            *seen.borrow_mut() += 1;
            if *seen.borrow() == 3 {
                if let Some(key) = *key_slot.borrow() {
                    assert!(ctx.timers().cancel(key));
                }
            }
        });
        *own_key.borrow_mut() = Some(key);

        assert_eq!(run(&mut timers, 10), 3);
        assert!(!timers.is_scheduled(key));
        assert_eq!(*count.borrow(), 3);
    }

    #[test]
    fn callback_cancels_a_later_timer_due_in_same_update() {
        let mut timers = Timers::new(1.0);
        let (log, make) = recorder();
        let victim = timers.after(Duration::from_millis(500), make("victim"));
        timers.after(Duration::from_millis(100), move |ctx| {
            ctx.timers().cancel(victim);
        });

        assert_eq!(run(&mut timers, 1), 1);
        assert!(log.borrow().is_empty());
        assert!(timers.is_empty());
    }

    #[test]
    #[should_panic(expected = "Speed must be finite and non-negative")]
    fn negative_speed_panics() {
        Timers::new(60.0).set_speed(-1.0);
    }

    #[test]
    #[should_panic(expected = "TPS must be positive")]
    fn zero_tps_panics() {
        Timers::new(0.0);
    }
}
