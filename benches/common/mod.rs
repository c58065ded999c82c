#![allow(dead_code)]

use plotters::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::Command;

#[derive(Deserialize)]
struct Estimates {
    mean: Stats,
}

#[derive(Deserialize)]
struct Stats {
    point_estimate: f64,
    confidence_interval: ConfidenceInterval,
}

#[derive(Deserialize)]
struct ConfidenceInterval {
    lower_bound: f64,
    upper_bound: f64,
}

/// `(x, mean, lower, upper)` in milliseconds, per series name.
pub type Series = BTreeMap<String, Vec<(usize, f64, f64, f64)>>;

/// Flat `dim`-dimensional points around `blobs` centres in `[0, 100)`,
/// one in ten drawn uniformly as background noise.
pub fn blobs(dim: usize, count: usize, blobs: usize, spread: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let centres: Vec<Vec<f64>> = (0..blobs)
        .map(|_| (0..dim).map(|_| rng.gen_range(0.0..100.0)).collect())
        .collect();
    let mut points = Vec::with_capacity(count * dim);
    for i in 0..count {
        if i % 10 == 0 {
            points.extend((0..dim).map(|_| rng.gen_range(0.0..100.0)));
        } else {
            let c = &centres[rng.gen_range(0..blobs)];
            points.extend(c.iter().map(|&x| x + rng.gen_range(-spread..spread)));
        }
    }
    points
}

/// Powers of two up to the available parallelism, which is always included.
pub fn thread_counts() -> Vec<usize> {
    let max_cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(8);
    let mut counts = Vec::new();
    let mut cores = 1;
    while cores <= max_cores {
        counts.push(cores);
        cores *= 2;
    }
    if counts.last().map_or(false, |&last| last < max_cores) {
        counts.push(max_cores);
    }
    counts
}

/// Reads criterion's estimates for `group/<series>/<x>` for every series and x.
pub fn read_estimates(group: &str, series: &[String], xs: &[usize]) -> Result<Series, Box<dyn std::error::Error>> {
    let root = Path::new("target/criterion").join(group);
    let mut data = Series::new();
    if !root.exists() {
        return Ok(data);
    }
    for name in series {
        let mut points = Vec::new();
        for &x in xs {
            let path = root.join(name).join(x.to_string()).join("base/estimates.json");
            if path.exists() {
                let reader = BufReader::new(File::open(&path)?);
                let estimates: Estimates = serde_json::from_reader(reader)?;
                points.push((
                    x,
                    estimates.mean.point_estimate / 1_000_000.0,
                    estimates.mean.confidence_interval.lower_bound / 1_000_000.0,
                    estimates.mean.confidence_interval.upper_bound / 1_000_000.0,
                ));
            }
        }
        if !points.is_empty() {
            points.sort_by_key(|k| k.0);
            data.insert(name.clone(), points);
        }
    }
    Ok(data)
}

fn git_hash() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Draws each series as a line with its confidence band into
/// `benches/results/<stem>_<git hash>.png`. With `log_scale` both axes are
/// logarithmic and a linear reference is drawn through the first sample.
pub fn plot(data: &Series, stem: &str, caption: &str, x_desc: &str, log_scale: bool) -> Result<(), Box<dyn std::error::Error>> {
    if data.is_empty() {
        return Ok(());
    }

    let out_dir = Path::new("benches/results");
    std::fs::create_dir_all(out_dir)?;
    let out_file = out_dir.join(format!("{}_{}.png", stem, git_hash()));
    let root_area = BitMapBackend::new(&out_file, (1024, 768)).into_drawing_area();
    root_area.fill(&WHITE)?;

    let min_x = data.values().flat_map(|v| v.iter().map(|p| p.0)).min().unwrap_or(1) as f64;
    let max_x = data.values().flat_map(|v| v.iter().map(|p| p.0)).max().unwrap_or(1) as f64;
    let min_y = data.values().flat_map(|v| v.iter().map(|p| p.2)).fold(f64::INFINITY, f64::min);
    let max_y = data.values().flat_map(|v| v.iter().map(|p| p.3)).fold(f64::NEG_INFINITY, f64::max);

    let mut builder = ChartBuilder::on(&root_area);
    builder
        .caption(caption, ("sans-serif", 40).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(80);

    if log_scale {
        let mut chart = builder.build_cartesian_2d(
            (min_x..max_x.max(min_x * 10.0)).log_scale(),
            (min_y * 0.8..max_y * 1.5).log_scale(),
        )?;
        chart.configure_mesh().x_desc(x_desc).y_desc("Time (ms)").draw()?;

        if let Some(&(start_n, start_t, _, _)) = data.values().next().and_then(|s| s.first()) {
            let step = 10.0f64.powf(0.05);
            let mut linear = Vec::new();
            let mut n = min_x;
            while n <= max_x * 1.1 {
                linear.push((n, start_t * (n / start_n as f64)));
                n *= step;
            }
            chart
                .draw_series(PointSeries::of_element(linear, 1, &BLACK, &|c, s, st| {
                    Circle::new(c, s, st.filled())
                }))?
                .label("Linear")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLACK));
        }
        draw_series(&mut chart, data)?;
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    } else {
        let mut chart = builder.build_cartesian_2d(min_x..max_x.max(min_x + 1.0), 0.0..max_y * 1.1)?;
        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc("Time (ms)")
            .x_label_formatter(&|v| format!("{:.0}", v))
            .draw()?;
        draw_series(&mut chart, data)?;
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    println!("Plot saved to {:?}", out_file);
    Ok(())
}

fn draw_series<DB, X, Y>(chart: &mut ChartContext<'_, DB, Cartesian2d<X, Y>>, data: &Series) -> Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
    X: Ranged<ValueType = f64>,
    Y: Ranged<ValueType = f64>,
{
    let colors = [RED, BLUE, GREEN, MAGENTA, CYAN];
    for (i, (name, points)) in data.iter().enumerate() {
        let color = colors[i % colors.len()];

        let mut band = Vec::new();
        for (x, _, _, u) in points.iter() {
            band.push((*x as f64, *u));
        }
        for (x, _, l, _) in points.iter().rev() {
            band.push((*x as f64, *l));
        }
        chart.draw_series(std::iter::once(Polygon::new(band, color.mix(0.2).filled())))?;

        chart
            .draw_series(LineSeries::new(points.iter().map(|(x, y, _, _)| (*x as f64, *y)), &color))?
            .label(name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));

        chart.draw_series(PointSeries::of_element(
            points.iter().map(|(x, y, _, _)| (*x as f64, *y)),
            5,
            &color,
            &|c, s, st| EmptyElement::at(c) + Circle::new((0, 0), s, st.filled()),
        ))?;
    }
    Ok(())
}
