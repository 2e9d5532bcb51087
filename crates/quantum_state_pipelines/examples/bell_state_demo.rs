// =============================================================================
// MACROHARD Quantum Visualizer - Bell State Demo
// =============================================================================
// Table of Contents:
//   1. Circuit construction
//   2. Routed execution
//   3. Per-qubit reduced states
//   4. Measured variant on every engine
// =============================================================================
// Purpose: Walks a Bell pair through the router and the three engines and
//          prints each qubit's Bloch vector, purity and density matrix.
//          Set RUST_LOG=debug to see routing and engine events.
// =============================================================================

use quantum_state_pipelines::prelude::*;
use tracing_subscriber::EnvFilter;

fn print_result(result: &SimulationResult) {
    println!(
        "   Engine: {} (routed to {}, fallback used: {})",
        result.engine, result.routed_engine, result.fallback_used
    );
    println!("   Execution time: {:.6} s", result.execution_time);
    for (qubit, report) in &result.qubits {
        let [x, y, z] = report.bloch.components();
        println!("   q[{qubit}] bloch = [{x:+.4}, {y:+.4}, {z:+.4}]  purity = {:.4}", report.purity);
        for line in report.rho.to_string().lines() {
            println!("          {line}");
        }
    }
    for diagnostic in &result.diagnostics {
        println!("   ! {diagnostic}");
    }
    println!();
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("MACROHARD Quantum Visualizer - Bell State Demonstration");
    println!();

    // =========================================================================
    // 1. Circuit construction
    // =========================================================================
    let bell_circuit = PresetCircuit::Bell.build();
    println!("Step 1: Bell circuit");
    println!("   Circuit ID: {}", bell_circuit.id());
    println!("   {}", bell_circuit.summary());
    println!();

    // =========================================================================
    // 2. Routed execution
    // =========================================================================
    let execution_engine =
        QuantumExecutionEngine::new().with_configuration(PipelineConfiguration::deterministic(2024));
    let estimate = execution_engine.estimate_resources(&bell_circuit, RECOMMENDED_SHOTS);
    println!("Step 2: Resource estimate on {}", estimate.engine);
    println!(
        "   memory {:.4} MiB, time {:.4} s, complexity {:?}",
        estimate.memory_mebibytes, estimate.time_seconds, estimate.complexity
    );
    println!();

    // =========================================================================
    // 3. Per-qubit reduced states
    // =========================================================================
    println!("Step 3: Automatic routing");
    let result = execution_engine.execute_circuit(&bell_circuit, RECOMMENDED_SHOTS)?;
    print_result(&result);

    // =========================================================================
    // 4. Measured variant on every engine
    // =========================================================================
    let mut measured_circuit = PresetCircuit::Bell.build();
    measured_circuit.apply_measurement(0, 0);

    println!("Step 4: Bell pair with qubit 0 measured");
    for engine in EngineName::ALL {
        println!(" - forced {engine}");
        let result = execution_engine.execute_with_options(
            &measured_circuit,
            4096,
            Some(engine.as_str()),
            &CancellationToken::new(),
        )?;
        print_result(&result);
    }

    println!("Pipelines:");
    for description in execution_engine.describe_pipelines() {
        println!(
            "   {:<14} max {:>2} qubits, measurements: {:<5} {}",
            description.engine.as_str(),
            description.maximum_quantum_bits,
            description.supports_measurements,
            description.description
        );
    }

    let json = result.to_json()?;
    println!();
    println!("Wire format of the Step 3 result:");
    println!("{json}");
    Ok(())
}
