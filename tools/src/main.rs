//! track-runner: headless route simulator for the SwiftEx depot.
//!
//! Usage:
//!   track-runner --from Karachi --to Islamabad
//!   track-runner --parcel SW1002 --db depot.db
//!   track-runner --book SW2001,Quetta,Lahore --list
//!   track-runner --dispatch-next --undo

use anyhow::Result;
use std::any::Any;
use std::env;
use swiftex_core::{
    config::MapConfig,
    engine::TrackEngine,
    map::{City, CityMap},
    render::{EdgeStyle, RenderSink},
    store::{self, booked_date_today, ParcelRecord, ParcelStore},
    types::TimeMs,
};

/// Render sink that narrates the simulation on stdout. Node/edge/marker
/// mechanics go to the debug log; status lines are the user's view.
struct ConsoleSink {
    last_status: String,
}

impl ConsoleSink {
    fn new() -> Self {
        Self {
            last_status: String::new(),
        }
    }
}

impl RenderSink for ConsoleSink {
    fn clear(&mut self) {
        log::debug!("map cleared");
    }

    fn draw_node(&mut self, city: &City) {
        log::debug!("node {} at ({}%, {}%)", city.name, city.x, city.y);
    }

    fn draw_edge(&mut self, from: &City, to: &City, style: EdgeStyle) {
        log::debug!("edge {} - {} ({style:?})", from.name, to.name);
    }

    fn begin_marker_move(&mut self, from: &City, to: &City, duration_ms: TimeMs) {
        log::debug!(
            "marker moving {} -> {} over {duration_ms}ms",
            from.name,
            to.name
        );
    }

    fn set_marker_position(&mut self, x: f64, y: f64) {
        log::debug!("marker at ({x}%, {y}%)");
    }

    fn set_marker_visible(&mut self, visible: bool) {
        log::debug!("marker visible: {visible}");
    }

    fn mark_node_visited(&mut self, city: &str) {
        log::debug!("node visited: {city}");
    }

    fn set_status_text(&mut self, text: &str) {
        self.last_status = text.to_string();
        println!("STATUS  {text}");
    }

    fn append_status_text(&mut self, text: &str) {
        self.last_status.push_str(text);
        println!("STATUS  {}", self.last_status);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = str_arg(&args, "--data-dir").unwrap_or("./data");
    let from = str_arg(&args, "--from");
    let to = str_arg(&args, "--to");
    let parcel = str_arg(&args, "--parcel");
    let list = args.iter().any(|a| a == "--list");
    let dispatch_next = args.iter().any(|a| a == "--dispatch-next");
    let undo = args.iter().any(|a| a == "--undo");
    let json_events = args.iter().any(|a| a == "--json-events");

    println!("SwiftEx — track-runner");
    println!("  db:        {db}");
    println!("  data_dir:  {data_dir}");
    println!();

    let store = ParcelStore::open(db)?;
    store.migrate()?;
    store.seed_demo_data()?;

    let map = match MapConfig::load(data_dir) {
        Ok(config) => CityMap::from_config(&config)?,
        Err(e) => {
            log::warn!("{e}; falling back to the built-in demo map");
            CityMap::from_config(&MapConfig::default_demo())?
        }
    };

    let mut engine = TrackEngine::new(map, store, Box::new(ConsoleSink::new()));

    if let Some(booking) = str_arg(&args, "--book") {
        book_parcel(&mut engine, booking)?;
    }
    if list {
        print_inventory(&engine)?;
    }
    if dispatch_next {
        match engine.store_mut().process_next()? {
            Some(p) => println!(
                "DISPATCHED  {} is now In Transit to {}",
                p.parcel_id, p.receiver
            ),
            None => println!("DISPATCHED  warehouse empty, nothing booked"),
        }
    }
    if undo {
        match engine.store_mut().undo_last()? {
            Some(outcome) => println!("UNDO  {outcome:?}"),
            None => println!("UNDO  nothing to undo"),
        }
    }

    let events = match (from, to, parcel) {
        (Some(from), Some(to), _) => {
            let outcome = engine.run_simulation(from, to)?;
            log::info!("run_simulation: {outcome:?}");
            engine.run_until_idle()?
        }
        (_, _, Some(id)) => {
            let outcome = engine.run_simulation_for_parcel(id)?;
            log::info!("run_simulation_for_parcel: {outcome:?}");
            engine.run_until_idle()?
        }
        _ => {
            // Default demo: track the first seeded parcel.
            let outcome = engine.run_simulation_for_parcel("SW1001")?;
            log::info!("run_simulation_for_parcel: {outcome:?}");
            engine.run_until_idle()?
        }
    };

    if json_events {
        for entry in engine.store().all_events()? {
            println!("{}", entry.payload);
        }
    }

    print_summary(&engine, events.len())?;
    Ok(())
}

/// Book a new parcel from an "id,sender,receiver" triple, dated today.
fn book_parcel(engine: &mut TrackEngine, booking: &str) -> Result<()> {
    let parts: Vec<&str> = booking.split(',').collect();
    let &[id, sender, receiver] = parts.as_slice() else {
        anyhow::bail!("--book expects id,sender,receiver, got '{booking}'");
    };
    let record = ParcelRecord {
        parcel_id: id.into(),
        sender: sender.into(),
        receiver: receiver.into(),
        weight_kg: 1.0,
        priority: 2,
        status: store::status::BOOKED.into(),
        booked_date: booked_date_today(),
    };
    if engine.store_mut().add_parcel(&record)? {
        println!("BOOKED  {id}: {sender} -> {receiver}");
    } else {
        println!("BOOKED  rejected, id {id} already exists");
    }
    Ok(())
}

fn print_inventory(engine: &TrackEngine) -> Result<()> {
    println!("=== INVENTORY ===");
    for p in engine.store().all_parcels()? {
        println!(
            "  {}  {} -> {}  {:>5.1}kg  p{}  {}  ({})",
            p.parcel_id, p.sender, p.receiver, p.weight_kg, p.priority, p.status, p.booked_date
        );
    }
    println!();
    Ok(())
}

fn print_summary(engine: &TrackEngine, event_count: usize) -> Result<()> {
    let hops = engine.store().event_count("hop_completed")?;
    let arrivals = engine.store().event_count("arrived")?;
    let stats = engine.store().stats()?;

    println!();
    println!("=== RUN SUMMARY ===");
    println!("  final time:  {}ms", engine.clock.now());
    println!("  events:      {event_count}");
    println!("  hops done:   {hops}");
    println!("  arrived:     {}", arrivals > 0);

    println!();
    println!("=== DEPOT SUMMARY ===");
    println!("  parcels:     {}", stats.total);
    println!("  booked:      {}", stats.booked);
    println!("  in transit:  {}", stats.in_transit);
    println!("  delivered:   {}", stats.delivered);
    println!("  cancelled:   {}", stats.cancelled);
    Ok(())
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
