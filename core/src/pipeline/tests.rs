use super::*;
use crate::combat_log::{from_json, to_json};
use crate::timekeeping::ClockSource;

// 2025-01-01T00:00:00 in "local epoch ms"
const BASE: i64 = 1_735_689_600_000;

pub(crate) struct FixedClock {
    pub(crate) now: i64,
}

impl ClockSource for FixedClock {
    fn now_local_epoch_ms(&self) -> i64 {
        self.now
    }

    fn utc_offset_ms(&self) -> i64 {
        0
    }

    fn is_synchronized(&self) -> bool {
        true
    }
}

fn pipeline() -> Pipeline {
    Pipeline::with_clock(Arc::new(FixedClock {
        now: BASE + 80_000_000,
    }))
}

const OWNER: &str = "@Kel Vara#690000000000001|(0,0,0,0)|(100/100)";
const DROID: &str = "Sentry Droid {3273941900591104}:5320000112163|(0,0,0,0)|(50000/50000)";
const OWNER_ID: u64 = 690000000000001;

fn area_line(time: &str) -> String {
    format!(
        "[{time}] [{OWNER}] [] [] \
         [AreaEntered {{836045448953664}}: Dxun - The CI-004 Facility {{833571547775792}} 8 Player Master {{836045448953655}}] (he3001) <v7.0.0b>"
    )
}

fn enter_combat_line(time: &str) -> String {
    format!("[{time}] [{OWNER}] [] [] [Event {{836045448945472}}: EnterCombat {{836045448945489}}]")
}

fn damage_line(time: &str, amount: i64) -> String {
    format!(
        "[{time}] [{OWNER}] [{DROID}] [Slash {{812005418467328}}] \
         [Event {{836045448945472}}: Damage {{836045448945501}}] ({amount} energy {{836045448940874}}) <{amount}>"
    )
}

fn exit_combat_line(time: &str) -> String {
    format!("[{time}] [{OWNER}] [] [] [Event {{836045448945472}}: ExitCombat {{836045448945490}}]")
}

fn feed(pipeline: &mut Pipeline, lines: &[String]) {
    for line in lines {
        let _ = pipeline.process_line(line);
    }
}

#[test]
fn full_stream_through_all_stages() {
    let mut p = pipeline();
    let meter = DamageMeter::new();
    p.register_plugin(Box::new(meter.clone()));

    feed(
        &mut p,
        &[
            area_line("06:00:00.000"),
            enter_combat_line("06:00:01.000"),
            damage_line("06:00:02.000", 500),
            damage_line("06:00:03.000", 250),
            exit_combat_line("06:00:10.000"),
        ],
    );

    assert_eq!(p.stats().lines_processed, 5);
    assert_eq!(p.stats().malformed_lines, 0);
    assert!(!p.is_in_combat());
    assert_eq!(p.state().combat_duration_ms(), 9_000);

    // reconstructor anchored on the area event
    assert_eq!(p.reconstructor_stats().area_events, 1);
    let last = p.last_event().unwrap();
    assert_eq!(last.time.epoch_ms, BASE + 6 * 3_600_000 + 10_000);

    // registry attribution and owner marking
    let owner = p.registry().owner().unwrap();
    assert_eq!(owner.id, OWNER_ID);
    assert_eq!(owner.totals.damage_done, 750);

    // plugin saw the same events
    assert_eq!(meter.total_damage(), 750);
    assert_eq!(meter.damage_for(OWNER_ID), 750);
    assert_eq!(meter.rows().first(), Some(&(OWNER_ID, 750)));
}

#[test]
fn malformed_lines_are_dropped_and_counted() {
    let mut p = pipeline();
    let err = p.process_line("this is not a combat line").unwrap_err();
    assert!(matches!(err, PipelineError::MalformedLine(_)));
    assert!(p.process_line(&enter_combat_line("06:00:01.000")).is_ok());
    assert_eq!(p.stats().lines_processed, 2);
    assert_eq!(p.stats().malformed_lines, 1);
    assert!(p.is_in_combat());
}

#[test]
fn caches_track_last_events() {
    let mut p = pipeline();
    feed(
        &mut p,
        &[
            area_line("06:00:00.000"),
            enter_combat_line("06:00:01.000"),
            damage_line("06:00:02.000", 100),
        ],
    );

    assert!(p.last_area_entered().unwrap().is_area_entered());
    assert!(p.last_enter_combat().unwrap().is_enter_combat());
    assert!(p.last_event().unwrap().is_damage());
    assert_eq!(
        p.last_area_entered().unwrap().area.unwrap().raw_value,
        Some("he3001")
    );
}

#[test]
fn registry_resets_exactly_on_combat_start() {
    let mut p = pipeline();
    feed(
        &mut p,
        &[
            area_line("06:00:00.000"),
            // damage before combat starts accumulates
            damage_line("06:00:00.500", 42),
            enter_combat_line("06:00:01.000"),
            damage_line("06:00:02.000", 500),
        ],
    );

    // the pre-combat 42 was wiped by the combat-start reset
    let owner = p.registry().owner().unwrap();
    assert_eq!(owner.totals.damage_done, 500);
    // the droid was evicted at combat start and recreated by the new hit
    assert_eq!(p.registry().get(5320000112163).unwrap().totals.damage_taken, 500);
}

struct CountingPlugin {
    seen: Arc<std::sync::Mutex<Vec<String>>>,
    label: &'static str,
    priority: i32,
}

impl Plugin for CountingPlugin {
    fn name(&self) -> &str {
        self.label
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn ingest(&mut self, _ctx: &PluginContext<'_>, _event: &mut CombatEvent<'_>) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(self.label.to_string());
    }

    fn reset(&mut self) {}
}

#[test]
fn plugins_dispatch_in_priority_order() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut p = pipeline();
    p.register_plugin(Box::new(CountingPlugin {
        seen: Arc::clone(&seen),
        label: "late",
        priority: 10,
    }));
    p.register_plugin(Box::new(CountingPlugin {
        seen: Arc::clone(&seen),
        label: "early",
        priority: 1,
    }));
    p.register_plugin(Box::new(CountingPlugin {
        seen: Arc::clone(&seen),
        label: "tie",
        priority: 10,
    }));

    let _ = p.process_line(&enter_combat_line("06:00:01.000"));
    let order = seen.lock().unwrap_or_else(|e| e.into_inner()).clone();
    assert_eq!(order, vec!["early", "late", "tie"]);
}

#[test]
fn plugin_ids_are_assigned_in_registration_order() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut p = pipeline();
    let first = p.register_plugin(Box::new(CountingPlugin {
        seen: Arc::clone(&seen),
        label: "a",
        priority: 5,
    }));
    let second = p.register_plugin(Box::new(CountingPlugin {
        seen,
        label: "b",
        priority: -3,
    }));
    assert_eq!((first, second), (1, 2));
    assert_eq!(p.plugin_id_by_name("b"), Some(2));
    assert_eq!(p.plugin_info(2), Some(("b", -3, true)));
}

#[test]
fn negative_priority_plugins_are_not_dispatched() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut p = pipeline();
    p.register_plugin(Box::new(CountingPlugin {
        seen: Arc::clone(&seen),
        label: "builtin",
        priority: -1,
    }));
    let _ = p.process_line(&enter_combat_line("06:00:01.000"));
    assert!(seen.lock().unwrap_or_else(|e| e.into_inner()).is_empty());
}

struct PanickyPlugin;

impl Plugin for PanickyPlugin {
    fn name(&self) -> &str {
        "panicky"
    }

    fn ingest(&mut self, _ctx: &PluginContext<'_>, _event: &mut CombatEvent<'_>) {
        panic!("boom");
    }

    fn reset(&mut self) {}
}

#[test]
fn panicking_plugin_is_disabled_and_stream_continues() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut p = pipeline();
    let panicky = p.register_plugin(Box::new(PanickyPlugin));
    p.register_plugin(Box::new(CountingPlugin {
        seen: Arc::clone(&seen),
        label: "survivor",
        priority: 50,
    }));

    let _ = p.process_line(&enter_combat_line("06:00:01.000"));
    let _ = p.process_line(&damage_line("06:00:02.000", 100));

    // later plugins still ran for the same event, and the stream went on
    assert_eq!(seen.lock().unwrap_or_else(|e| e.into_inner()).len(), 2);
    assert_eq!(p.plugin_info(panicky).map(|(_, _, enabled)| enabled), Some(false));
    assert!(p.is_in_combat());
}

#[test]
fn area_entered_resets_plugins() {
    let mut p = pipeline();
    let meter = DamageMeter::new();
    p.register_plugin(Box::new(meter.clone()));

    feed(
        &mut p,
        &[
            enter_combat_line("06:00:01.000"),
            damage_line("06:00:02.000", 500),
            area_line("06:10:00.000"),
        ],
    );
    assert_eq!(meter.total_damage(), 0);
}

mod abi_surface {
    use super::*;
    use crate::pipeline::abi::*;
    use std::ffi::{c_char, c_int, c_void, CStr};
    use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

    static CREATED: AtomicU32 = AtomicU32::new(0);
    static DESTROYED: AtomicU32 = AtomicU32::new(0);
    static INGESTED: AtomicU32 = AtomicU32::new(0);
    static RESETS: AtomicU32 = AtomicU32::new(0);
    static LAST_T_MS: AtomicI64 = AtomicI64::new(-1);

    unsafe extern "C" fn create() -> *mut c_void {
        CREATED.fetch_add(1, Ordering::SeqCst);
        Box::into_raw(Box::new(0u8)) as *mut c_void
    }

    unsafe extern "C" fn destroy(handle: *mut c_void) {
        DESTROYED.fetch_add(1, Ordering::SeqCst);
        drop(unsafe { Box::from_raw(handle as *mut u8) });
    }

    unsafe extern "C" fn get_info() -> PluginInfo {
        PluginInfo {
            name: c"json sink".as_ptr(),
            version: c"1.0.0".as_ptr(),
            author: c"tests".as_ptr(),
            description: c"records events crossing the abi".as_ptr(),
            api_version: PLUGIN_API_VERSION,
        }
    }

    unsafe extern "C" fn get_info_wrong_version() -> PluginInfo {
        PluginInfo {
            name: c"stale".as_ptr(),
            version: c"0.0.1".as_ptr(),
            author: c"tests".as_ptr(),
            description: c"built against an older host".as_ptr(),
            api_version: PLUGIN_API_VERSION + 1,
        }
    }

    unsafe extern "C" fn ingest(_handle: *mut c_void, json: *const c_char) {
        INGESTED.fetch_add(1, Ordering::SeqCst);
        let json = unsafe { CStr::from_ptr(json) }.to_str().unwrap_or("");
        if let Ok(event) = from_json(json) {
            LAST_T_MS.store(event.time.combat_ms as i64, Ordering::SeqCst);
        }
    }

    unsafe extern "C" fn reset(_handle: *mut c_void) {
        RESETS.fetch_add(1, Ordering::SeqCst);
    }

    const API: ExternalPluginApi = ExternalPluginApi {
        create,
        destroy,
        get_info,
        ingest,
        reset,
    };

    const STALE_API: ExternalPluginApi = ExternalPluginApi {
        create,
        destroy,
        get_info: get_info_wrong_version,
        ingest,
        reset,
    };

    #[test]
    fn external_plugin_lifecycle_over_the_c_surface() {
        let parser = create_parser();
        assert!(!parser.is_null());

        let id = unsafe { load_external_plugin_direct(parser, &API) };
        assert!(id != 0);
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);

        let name = c"json sink";
        assert_eq!(unsafe { get_plugin_by_name(parser, name.as_ptr()) }, id);
        let mut status = PluginStatus {
            id: 0,
            priority: 0,
            enabled: false,
        };
        assert!(unsafe { get_plugin_by_id(parser, id, &mut status) });
        assert_eq!(status.priority as i32, 100);
        assert!(status.enabled);

        let line = c"[06:00:02.000] [@Kel Vara#690000000000001|(0,0,0,0)|(100/100)] [=] [Slash {1}] [Event {836045448945472}: Damage {836045448945501}] (50)";
        assert!(unsafe { process_combat_line(parser, line.as_ptr()) });
        assert_eq!(INGESTED.load(Ordering::SeqCst), 1);
        // the event crossed the boundary as json and decoded on the far side
        assert_eq!(LAST_T_MS.load(Ordering::SeqCst), 6 * 3_600_000 + 2_000);

        unsafe { reset_all_plugins(parser) };
        assert_eq!(RESETS.load(Ordering::SeqCst), 1);

        let bad = c"not a line";
        assert!(!unsafe { process_combat_line(parser, bad.as_ptr()) });

        unsafe { destroy_parser(parser) };
        assert_eq!(DESTROYED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn api_version_mismatch_is_refused() {
        let parser = create_parser();
        let id = unsafe { load_external_plugin_direct(parser, &STALE_API) };
        assert_eq!(id, 0);
        unsafe { destroy_parser(parser) };
    }

    #[test]
    fn api_version_mismatch_is_a_typed_error() {
        let mut p = Pipeline::new();
        let err = unsafe { register_external(&mut p, &STALE_API) }.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::AbiMismatch { plugin, host }
                if plugin == host + 1 && host == PLUGIN_API_VERSION
        ));
        assert_eq!(p.plugin_count(), 0);
    }

    #[test]
    fn path_loading_is_unavailable() {
        let parser = create_parser();
        let path = c"/tmp/plugin.so";
        assert_eq!(unsafe { load_external_plugin(parser, path.as_ptr()) }, 0);
        unsafe { destroy_parser(parser) };
    }

    #[test]
    fn null_handles_are_harmless() {
        assert!(!unsafe { process_combat_line(std::ptr::null_mut(), std::ptr::null()) });
        assert!(!unsafe { is_in_combat(std::ptr::null_mut()) });
        unsafe { destroy_parser(std::ptr::null_mut()) };
        let _unused: c_int = PLUGIN_API_VERSION;
    }
}

mod generated {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_entity(rng: &mut ChaCha8Rng) -> String {
        match rng.gen_range(0..4) {
            0 => String::new(),
            1 => format!(
                "@Player{}#69{:013}|({:.1},{:.1},{:.1},{:.1})|({}/{})",
                rng.gen_range(0..5),
                rng.gen_range(0..999u64),
                rng.gen_range(-500.0..500.0),
                rng.gen_range(-500.0..500.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-3.2..3.2),
                rng.gen_range(0..400_000),
                400_000,
            ),
            2 => format!(
                "War Droid {{{}}}:{}|(0,0,0,0)|({}/{})",
                rng.gen_range(1_000_000u64..9_999_999),
                rng.gen_range(1_000u64..99_999),
                rng.gen_range(0..50_000),
                50_000,
            ),
            _ => format!(
                "@Owner{}#69{:013}/Companion {{{}}}:{}|(0,0,0,0)|(1000/1000)",
                rng.gen_range(0..5),
                rng.gen_range(0..999u64),
                rng.gen_range(1_000_000u64..9_999_999),
                rng.gen_range(1_000u64..99_999),
            ),
        }
    }

    fn random_tail(rng: &mut ChaCha8Rng) -> String {
        match rng.gen_range(0..6) {
            0 => String::new(),
            1 => format!("({})", rng.gen_range(0..100_000)),
            2 => format!(
                "({}* ~{} kinetic {{836045448940873}}) <{:.1}>",
                rng.gen_range(0..100_000),
                rng.gen_range(0..100_000),
                rng.gen_range(-5_000.0..50_000.0),
            ),
            3 => format!("({} charges)", rng.gen_range(1..10)),
            4 => format!(
                "({} energy {{836045448940874}} -shield {{836045448945509}} ({} absorbed {{836045448945511}}))",
                rng.gen_range(0..100_000),
                rng.gen_range(0..10_000),
            ),
            _ => format!("(0 -{})", ["miss", "dodge", "parry", "resist", "immune", "deflect", "glance"][rng.gen_range(0..7)]),
        }
    }

    fn random_line(rng: &mut ChaCha8Rng, combat_ms: u32) -> String {
        let time = format!(
            "{:02}:{:02}:{:02}.{:03}",
            combat_ms / 3_600_000,
            (combat_ms / 60_000) % 60,
            (combat_ms / 1_000) % 60,
            combat_ms % 1_000,
        );
        let source = random_entity(rng);
        let target = if rng.gen_bool(0.2) && !source.is_empty() {
            "=".to_string()
        } else {
            random_entity(rng)
        };
        let (event, tail) = match rng.gen_range(0..5) {
            0 => (
                "Event {836045448945472}: Damage {836045448945501}".to_string(),
                random_tail(rng),
            ),
            1 => (
                "Event {836045448945472}: Heal {836045448945500}".to_string(),
                random_tail(rng),
            ),
            2 => (
                "ApplyEffect {836045448945477}: Sprint {810670782152704}".to_string(),
                String::new(),
            ),
            3 => (
                "Event {836045448945472}: EnterCombat {836045448945489}".to_string(),
                String::new(),
            ),
            _ => (
                "Event {836045448945472}: ExitCombat {836045448945490}".to_string(),
                String::new(),
            ),
        };
        format!("[{time}] [{source}] [{target}] [Strike {{4504}}] [{event}] {tail}")
    }

    #[test]
    fn random_well_formed_lines_never_panic_and_round_trip() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let parser = crate::combat_log::LineParser::new();
        let mut p = pipeline();

        let mut last_epoch = i64::MIN;
        let mut t: i64 = 40_000_000;
        for _ in 0..1_500 {
            t += rng.gen_range(0..2_000);
            let jitter = rng.gen_range(0..5_000);
            let combat_ms = (t - jitter).max(0) as u32;
            let line = random_line(&mut rng, combat_ms);

            // parse idempotence
            let a = parser.parse_line(&line).expect("generated line parses");
            let b = parser.parse_line(&line).expect("generated line parses");
            assert_eq!(a, b, "parse not idempotent for {line:?}");

            // json round trip (json-level identity)
            let json = to_json(&a);
            let back = from_json(&json).expect("wire json parses");
            assert_eq!(to_json(&back), json, "round trip diverged for {line:?}");

            // full pipeline never panics, epoch stays monotone
            p.process_line(&line).expect("pipeline accepts the line");
            let epoch = p.last_event().unwrap().time.epoch_ms;
            assert!(epoch >= last_epoch, "epoch regressed on {line:?}");
            last_epoch = epoch;
        }
    }
}
