use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }
}

struct Route {
    state: &'static str,
    slug: &'static str,
    from: &'static str,
    to: &'static str,
    hours: u32,
}

const ROUTES: &[Route] = &[
    Route { state: "APSRTC", slug: "vijayawada-to-hyderabad", from: "Vijayawada", to: "Hyderabad", hours: 6 },
    Route { state: "APSRTC", slug: "guntur-to-chennai", from: "Guntur", to: "Chennai", hours: 8 },
    Route { state: "KERALA RTC", slug: "kochi-to-bangalore", from: "Kochi", to: "Bangalore", hours: 10 },
    Route { state: "KERALA RTC", slug: "trivandrum-to-kozhikode", from: "Trivandrum", to: "Kozhikode", hours: 9 },
    Route { state: "TSRTC", slug: "hyderabad-to-vijayawada", from: "Hyderabad", to: "Vijayawada", hours: 6 },
    Route { state: "RSRTC", slug: "jaipur-to-delhi", from: "Jaipur", to: "Delhi", hours: 6 },
    Route { state: "HRTC", slug: "shimla-to-chandigarh", from: "Shimla", to: "Chandigarh", hours: 4 },
    Route { state: "WBTC", slug: "kolkata-to-digha", from: "Kolkata", to: "Digha", hours: 5 },
];

const BUSNAMES: &[&str] = &["Garuda Plus", "Indra", "Super Luxury", "Rajdhani", "Express", "Volvo Multi Axle"];
const BUSTYPES: &[&str] = &[
    "AC Sleeper (2+1)",
    "Non-AC Seater (2+2)",
    "A/C Seater / Sleeper (2+1)",
    "Volvo A/C Semi Sleeper (2+2)",
];
const DEPARTURES: &[&str] = &["06:00", "09:30", "13:15", "18:45", "21:00", "22:30"];

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    let mut state = Vec::new();
    let mut route_name = Vec::new();
    let mut route_url = Vec::new();
    let mut busname = Vec::new();
    let mut bustype = Vec::new();
    let mut departing_time = Vec::new();
    let mut departure_location = Vec::new();
    let mut reaching_time = Vec::new();
    let mut arrival_location = Vec::new();
    let mut star_rating: Vec<Option<f64>> = Vec::new();
    let mut price = Vec::new();
    let mut seats_available = Vec::new();

    for route in ROUTES {
        let buses = 4 + rng.below(6);
        for _ in 0..buses {
            let depart = rng.pick(DEPARTURES);
            let depart_hour: u32 = depart[..2].parse().context("departure hour")?;
            let arrive = format!("{:02}:{}", (depart_hour + route.hours) % 24, &depart[3..]);

            state.push(route.state.to_string());
            route_name.push(format!("{} to {}", route.from, route.to));
            route_url.push(format!("https://www.redbus.in/bus-tickets/{}", route.slug));
            busname.push(format!("{} {}", route.state, rng.pick(BUSNAMES)));
            bustype.push(rng.pick(BUSTYPES).to_string());
            departing_time.push(depart.to_string());
            departure_location.push(route.from.to_string());
            reaching_time.push(arrive);
            arrival_location.push(route.to.to_string());
            // Unrated buses exist on the site; keep a few nulls.
            star_rating.push(if rng.below(8) == 0 {
                None
            } else {
                Some((20.0 + rng.next_f64() * 30.0).round() / 10.0)
            });
            price.push((150.0 + rng.next_f64() * route.hours as f64 * 180.0).round());
            seats_available.push(rng.below(45) as i64);
        }
    }

    let utf8 = |name: &str| Field::new(name, DataType::Utf8, false);
    let schema = Arc::new(Schema::new(vec![
        utf8("state"),
        utf8("route_name"),
        utf8("route_url"),
        utf8("busname"),
        utf8("bustype"),
        utf8("departing_time"),
        utf8("departure_location"),
        utf8("reaching_time"),
        utf8("arrival_location"),
        Field::new("star_rating", DataType::Float64, true),
        Field::new("price", DataType::Float64, false),
        Field::new("seats_available", DataType::Int64, false),
    ]));

    let rows = state.len();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(state)),
            Arc::new(StringArray::from(route_name)),
            Arc::new(StringArray::from(route_url)),
            Arc::new(StringArray::from(busname)),
            Arc::new(StringArray::from(bustype)),
            Arc::new(StringArray::from(departing_time)),
            Arc::new(StringArray::from(departure_location)),
            Arc::new(StringArray::from(reaching_time)),
            Arc::new(StringArray::from(arrival_location)),
            Arc::new(Float64Array::from(star_rating)),
            Arc::new(Float64Array::from(price)),
            Arc::new(Int64Array::from(seats_available)),
        ],
    )
    .context("building record batch")?;

    let preview = pretty_format_batches(&[batch.slice(0, rows.min(5))]).context("formatting preview")?;
    log::info!("First rows:\n{preview}");

    // Write Parquet
    let output_path = "bus_routes.parquet";
    let file = std::fs::File::create(output_path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;

    println!("Wrote {rows} bus rows across {} routes to {output_path}", ROUTES.len());
    Ok(())
}
