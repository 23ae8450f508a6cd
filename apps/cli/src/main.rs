// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wayplan command-line front end.
//!
//! # Commands
//!
//! - `detect <image>` - detection document (walls, rooms, doors, ...)
//! - `skeleton <image>` - navigation graph from the walkable skeleton
//! - `graph <image>` - detections plus the navigation graph built from them
//! - `rebuild <detections.json>` - graph from a hand-edited detection document
//! - `route <graph.json> <from> <to> [--by-name] [--algorithm astar|dijkstra]`
//! - `search <graph.json> <query> [--limit n]`
//! - `summary <graph.json>` - counts report; also reads `graph` output
//! - `points <graph.json>` - start points and destinations
//!
//! Results go to stdout as JSON, or to `--output <file>`. Logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use image::{DynamicImage, ImageReader};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wayplan_navigation::{
    search_limited, select_navigation_points, Algorithm, GraphBuilder, NavigationGraph, PathResult, PathValidation,
    Pathfinder,
};
use wayplan_vision::{detect_floor_plan, extract_skeleton_from_image, FloorPlanDetections};

mod config;

use config::Config;

const USAGE: &str = "\
usage: wayplan <command> [options]

commands:
  detect <image>                       detect walls, rooms, doors, hallways and stairs
  skeleton <image>                     build a graph from the walkable skeleton
  graph <image>                        detect and build the navigation graph
  rebuild <detections.json>            rebuild the graph from an edited detection file
  route <graph.json> <from> <to>       shortest path between two nodes
      --by-name                        resolve <from> and <to> by name search
      --algorithm astar|dijkstra       routing algorithm
  search <graph.json> <query>          ranked name matches
      --limit <n>                      maximum results (default 20)
  summary <graph.json>                 text report of scan, graph and point counts
                                       (JSON when --output is given)
  points <graph.json>                  start points and destinations by kind

options:
  --output <file>                      write JSON to a file instead of stdout
";

const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Debug, Default)]
struct Args {
    command: String,
    positional: Vec<String>,
    output: Option<PathBuf>,
    by_name: bool,
    algorithm: Option<Algorithm>,
    limit: Option<usize>,
}

impl Args {
    fn parse(raw: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut args = Args::default();
        let mut iter = raw.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--output" | "-o" => {
                    args.output = Some(iter.next().context("--output needs a path")?.into());
                }
                "--algorithm" => {
                    let value = iter.next().context("--algorithm needs a value")?;
                    args.algorithm = Some(Algorithm::parse(&value));
                }
                "--limit" => {
                    let value = iter.next().context("--limit needs a number")?;
                    args.limit = Some(value.parse().with_context(|| format!("invalid limit '{}'", value))?);
                }
                "--by-name" => args.by_name = true,
                "--help" | "-h" => {
                    args.command = "help".into();
                    return Ok(args);
                }
                flag if flag.starts_with("--") => bail!("unknown option {}", flag),
                _ if args.command.is_empty() => args.command = arg,
                _ => args.positional.push(arg),
            }
        }
        Ok(args)
    }

    fn positional(&self, index: usize, what: &str) -> anyhow::Result<&str> {
        self.positional
            .get(index)
            .map(String::as_str)
            .with_context(|| format!("{} requires <{}>\n\n{}", self.command, what, USAGE))
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,wayplan_vision=info,wayplan_navigation=info".into()),
    );
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        subscriber.json().init();
    } else {
        subscriber.pretty().init();
    }
}

fn load_image(path: &str) -> anyhow::Result<DynamicImage> {
    ImageReader::open(path)
        .with_context(|| format!("opening {}", path))?
        .with_guessed_format()
        .with_context(|| format!("reading {}", path))?
        .decode()
        .with_context(|| format!("decoding {}", path))
}

fn load_graph(path: &str) -> anyhow::Result<NavigationGraph> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    NavigationGraph::from_json(&json).with_context(|| format!("parsing graph {}", path))
}

/// A bare graph document, or the `{detections, navigationGraph}` written by `graph`
fn parse_graph_document(json: &str) -> anyhow::Result<(NavigationGraph, Option<FloorPlanDetections>)> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    match value.get("navigationGraph") {
        Some(graph) => {
            let detections = match value.get("detections") {
                Some(d) => Some(serde_json::from_value(d.clone()).context("parsing detections")?),
                None => None,
            };
            Ok((NavigationGraph::from_json(&graph.to_string())?, detections))
        }
        None => Ok((NavigationGraph::from_json(json)?, None)),
    }
}

fn emit<T: Serialize>(value: &T, output: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            let path = config.output_path(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "result written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[derive(Serialize)]
struct RouteOutput<'a> {
    #[serde(flatten)]
    result: &'a PathResult,
    validation: PathValidation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphOutput<'a> {
    detections: &'a FloorPlanDetections,
    navigation_graph: &'a NavigationGraph,
}

fn run(args: &Args, config: &Config) -> anyhow::Result<()> {
    let output = args.output.as_deref();
    match args.command.as_str() {
        "detect" => {
            let image = load_image(args.positional(0, "image")?)?;
            let detections = detect_floor_plan(&image, &config.pipeline()?, None)?;
            emit(&detections, output, config)
        }
        "skeleton" => {
            let image = load_image(args.positional(0, "image")?)?;
            let skeleton = extract_skeleton_from_image(&image, &config.pipeline()?)?;
            let graph = GraphBuilder::new(config.builder()).build_from_skeleton(&skeleton);
            emit(&graph, output, config)
        }
        "graph" => {
            let image = load_image(args.positional(0, "image")?)?;
            let detections = detect_floor_plan(&image, &config.pipeline()?, None)?;
            let graph = GraphBuilder::new(config.builder()).build(&detections);
            info!(
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                "navigation graph built"
            );
            emit(
                &GraphOutput {
                    detections: &detections,
                    navigation_graph: &graph,
                },
                output,
                config,
            )
        }
        "rebuild" => {
            let path = args.positional(0, "detections.json")?;
            let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
            let detections: FloorPlanDetections =
                serde_json::from_str(&json).with_context(|| format!("parsing detections {}", path))?;
            let graph = GraphBuilder::new(config.builder()).rebuild(&detections);
            emit(&graph, output, config)
        }
        "route" => {
            let graph = load_graph(args.positional(0, "graph.json")?)?;
            let from = args.positional(1, "from")?;
            let to = args.positional(2, "to")?;
            let algorithm = args.algorithm.unwrap_or(config.algorithm);
            let finder = Pathfinder::new(&graph);
            let result = if args.by_name {
                finder.find_path_by_name(from, to, algorithm)
            } else {
                finder.shortest_path(from, to, algorithm)
            };
            let result = result.with_directions();
            let validation = finder.validate_path(&result);
            if !validation.valid {
                warn!(errors = ?validation.errors, "route failed validation");
            }
            info!(
                found = result.found,
                distance = result.total_distance,
                algorithm = %algorithm,
                summary = %graph.summary().with_path(&result).compact(),
                "route computed"
            );
            emit(
                &RouteOutput {
                    result: &result,
                    validation,
                },
                output,
                config,
            )
        }
        "search" => {
            let graph = load_graph(args.positional(0, "graph.json")?)?;
            let query = args.positional(1, "query")?;
            let matches = search_limited(&graph, query, args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
            emit(&matches, output, config)
        }
        "summary" => {
            let path = args.positional(0, "graph.json")?;
            let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
            let (graph, detections) = parse_graph_document(&json).with_context(|| format!("parsing {}", path))?;
            let mut summary = graph.summary();
            if let Some(detections) = &detections {
                summary = summary.with_detections(detections);
            }
            info!(summary = %summary.compact(), "summary computed");
            match output {
                Some(_) => emit(&summary, output, config),
                None => {
                    print!("{}", summary.to_text());
                    Ok(())
                }
            }
        }
        "points" => {
            let graph = load_graph(args.positional(0, "graph.json")?)?;
            let points = select_navigation_points(&graph);
            for warning in &points.warnings {
                warn!("{}", warning);
            }
            emit(&points, output, config)
        }
        "help" => {
            print!("{}", USAGE);
            Ok(())
        }
        "" => bail!("missing command\n\n{}", USAGE),
        other => bail!("unknown command '{}'\n\n{}", other, USAGE),
    }
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing(config.json_logs);

    let args = Args::parse(std::env::args().skip(1))?;
    run(&args, &config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(items: &[&str]) -> anyhow::Result<Args> {
        Args::parse(items.iter().map(|s| s.to_string()))
    }

    #[test]
    fn route_flags_are_parsed() {
        let args = parse(&["route", "g.json", "101", "Lab B", "--by-name", "--algorithm", "dijkstra"]).unwrap();
        assert_eq!(args.command, "route");
        assert_eq!(args.positional, vec!["g.json", "101", "Lab B"]);
        assert!(args.by_name);
        assert_eq!(args.algorithm, Some(Algorithm::Dijkstra));
    }

    #[test]
    fn output_and_limit() {
        let args = parse(&["search", "g.json", "lab", "--limit", "3", "-o", "out/matches.json"]).unwrap();
        assert_eq!(args.limit, Some(3));
        assert_eq!(args.output, Some(PathBuf::from("out/matches.json")));
    }

    const GRAPH: &str = r#"{
        "nodes": [
            {"id": "room_1", "name": "Office", "type": "room", "position": {"x": 0, "y": 0}},
            {"id": "room_2", "name": "Cafe", "type": "room", "position": {"x": 10, "y": 0}}
        ],
        "edges": [{"id": "e1", "from": "room_1", "to": "room_2", "distance": 10}]
    }"#;

    #[test]
    fn bare_graph_document_is_read() {
        let (graph, detections) = parse_graph_document(GRAPH).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert!(detections.is_none());
    }

    #[test]
    fn graph_command_output_is_read() {
        let json = format!(
            r#"{{"detections": {{"walls": [], "rooms": [], "doors": [], "hallways": [], "stairs": [], "texts": [],
                "imageSize": {{"width": 40, "height": 30}}}}, "navigationGraph": {}}}"#,
            GRAPH
        );
        let (graph, detections) = parse_graph_document(&json).unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(detections.map(|d| d.image_size.width), Some(40));
    }

    #[test]
    fn route_output_carries_validation() {
        let (graph, _) = parse_graph_document(GRAPH).unwrap();
        let finder = Pathfinder::new(&graph);
        let result = finder.shortest_path("room_1", "room_2", Algorithm::AStar);
        let value = serde_json::to_value(RouteOutput {
            result: &result,
            validation: finder.validate_path(&result),
        })
        .unwrap();
        assert_eq!(value["found"], true);
        assert_eq!(value["totalDistance"], 10.0);
        assert_eq!(value["validation"]["valid"], true);
    }

    #[test]
    fn bad_arguments_are_reported() {
        assert!(parse(&["search", "--limit", "many"]).is_err());
        assert!(parse(&["detect", "--verbose"]).is_err());
        assert!(parse(&["detect", "--output"]).is_err());
        let missing = parse(&["route", "g.json"]).unwrap();
        assert!(missing.positional(1, "from").is_err());
    }
}
