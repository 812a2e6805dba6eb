use std::{env, process};

use genograph::{
    GenomeGraph, GenomeGraphError, GraphParser, LayeredLayout, LayoutConfig, StoreConfig,
    SubGraph, client::CommandLineConfig, store,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("{}", CommandLineConfig::help());
        return;
    }
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let config = match CommandLineConfig::from_args(&arg_refs) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    };

    if let Err(err) = run_command(&config) {
        eprintln!("command failed: {err}");
        process::exit(1);
    }
}

fn run_command(config: &CommandLineConfig) -> Result<(), String> {
    let store_config = StoreConfig::default();
    match config.command.as_str() {
        "parse" => {
            let graph = load_graph(config, &store_config)?;
            print_status(&graph).map_err(|e| e.to_string())
        }
        "status" => {
            let input = config.input()?;
            if !store::has_store(input, &store_config).map_err(|e| e.to_string())? {
                println!("no store for {input}");
                return Ok(());
            }
            let graph =
                GenomeGraph::open_for_input(input, &store_config).map_err(|e| e.to_string())?;
            print_status(&graph).map_err(|e| e.to_string())
        }
        "subgraph" => {
            let graph = load_graph(config, &store_config)?;
            let subgraph = SubGraph::build(&graph, config.center()?, config.radius)
                .map_err(|e| e.to_string())?;
            println!("nodes={}", join(subgraph.node_ids()));
            println!("roots={}", join(subgraph.roots().iter().copied()));
            println!("ends={}", join(subgraph.ends().iter().copied()));
            Ok(())
        }
        "topo" => {
            let graph = load_graph(config, &store_config)?;
            let subgraph = SubGraph::build(&graph, config.center()?, config.radius)
                .map_err(|e| e.to_string())?;
            let order = subgraph.topo_sort().map_err(|e| e.to_string())?;
            println!("{}", join(order.into_iter()));
            Ok(())
        }
        "layout" => {
            let graph = load_graph(config, &store_config)?;
            let subgraph = SubGraph::build(&graph, config.center()?, config.radius)
                .map_err(|e| e.to_string())?;
            let layout = LayeredLayout::new(LayoutConfig {
                zoom_level: config.zoom,
                ..LayoutConfig::default()
            })
            .map_err(|e| e.to_string())?;
            let result = layout.layout(&subgraph).map_err(|e| e.to_string())?;
            let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
            println!("{json}");
            Ok(())
        }
        "remove" => {
            let input = config.input()?;
            let removed =
                store::remove_store_for(input, &store_config).map_err(|e| e.to_string())?;
            println!("removed={removed}");
            Ok(())
        }
        other => Err(format!("unknown command {other}")),
    }
}

fn load_graph(
    config: &CommandLineConfig,
    store_config: &StoreConfig,
) -> Result<GenomeGraph, String> {
    GraphParser::new(config.input()?, store_config.clone())
        .spawn()
        .wait()
        .map_err(|e| e.to_string())
}

fn print_status(graph: &GenomeGraph) -> Result<(), GenomeGraphError> {
    let stats = graph.store().stats()?;
    println!("graph={} nodes={} genomes={}", graph.name(), stats.nodes, stats.genomes);
    Ok(())
}

fn join<I: Iterator<Item = i64>>(ids: I) -> String {
    ids.map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}
