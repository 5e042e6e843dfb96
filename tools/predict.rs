//! One-shot command-line scorer
//!
//! Usage:
//!   fraudguard-predict <model> <fraud|normal|clear>
//!   fraudguard-predict <model> <v1> <v2> <v3> <v4> <v5> <amount>
//!   fraudguard-predict <model> random [count] [fraud_rate]
//!
//! Validation and ONNX thread settings come from config/config.toml and
//! FRAUDGUARD__* variables, as for the server. `<model>` overrides model.path.

use anyhow::{bail, Context, Result};
use fraudguard::config::{AppConfig, ModelConfig};
use fraudguard::handler::{apply_preset, FormState, PredictionHandler, Preset, VerdictKind};
use fraudguard::metrics::PredictionMetrics;
use fraudguard::models::gateway::ModelGateway;
use fraudguard::render::render_verdict;
use fraudguard::types::features::FeatureVector;
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};

/// Random feature vector generator for smoke-testing a model
struct FeatureGenerator {
    rng: rand::rngs::ThreadRng,
}

impl FeatureGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Small normalized features and an everyday amount
    fn generate_legitimate(&mut self) -> FeatureVector {
        let mut v = [0.0; 5];
        for value in v.iter_mut() {
            *value = self.rng.gen_range(-1.0..1.0);
        }
        FeatureVector::from_parts(v, self.rng.gen_range(1.0..500.0))
    }

    /// Large-magnitude features in the fraud sample's direction and a high amount
    fn generate_suspicious(&mut self) -> FeatureVector {
        let direction = Preset::FraudSample.features();
        let mut v = [0.0; 5];
        for (value, sign) in v.iter_mut().zip(direction.values()) {
            *value = sign.signum() * self.rng.gen_range(1.0..4.0);
        }
        FeatureVector::from_parts(v, self.rng.gen_range(1000.0..10000.0))
    }
}

fn parse_features(args: &[String]) -> Result<FeatureVector> {
    let values: Vec<f64> = args
        .iter()
        .map(|a| a.parse::<f64>().with_context(|| format!("'{}' is not a number", a)))
        .collect::<Result<_>>()?;
    Ok(FeatureVector::try_from(values.as_slice())?)
}

/// Share of random vectors drawn from the suspicious generator, in `[0, 1]`
fn parse_fraud_rate(arg: Option<&str>) -> Result<f64> {
    let rate = match arg {
        Some(s) => s
            .parse::<f64>()
            .with_context(|| format!("'{}' is not a fraud rate", s))?,
        None => 0.1,
    };
    if !rate.is_finite() {
        bail!("fraud rate must be a finite number, got {}", rate);
    }
    Ok(rate.clamp(0.0, 1.0))
}

fn run_random(handler: &PredictionHandler, count: u64, fraud_rate: f64) -> Result<()> {
    let mut generator = FeatureGenerator::new();
    let mut rng = rand::thread_rng();

    let (mut generated_suspicious, mut flagged, mut failed) = (0u64, 0u64, 0u64);

    for i in 0..count {
        let features = if rng.gen_bool(fraud_rate) {
            generated_suspicious += 1;
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        match handler.submit_features(&features) {
            Ok(verdict) if verdict.kind == VerdictKind::Fraud => flagged += 1,
            Ok(_) => {}
            Err(e) => {
                failed += 1;
                warn!(error = %e, "Prediction failed");
            }
        }

        if (i + 1) % 100 == 0 {
            info!("Scored {}/{} vectors ({} flagged)", i + 1, count, flagged);
        }
    }

    println!(
        "Scored {} vectors: {} generated suspicious, {} flagged as fraud, {} failed",
        count, generated_suspicious, flagged, failed
    );
    handler.metrics().print_summary();

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fraudguard_predict=info".parse()?)
                .add_directive("fraudguard=warn".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        bail!(
            "usage: {} <model> <fraud|normal|clear | v1 v2 v3 v4 v5 amount | random [count] [fraud_rate]>",
            args.first().map(String::as_str).unwrap_or("fraudguard-predict")
        );
    }

    let config = AppConfig::load()?;
    let model = ModelConfig {
        path: args[1].clone(),
        ..config.model
    };

    let gateway = match ModelGateway::from_config(&model) {
        Ok(gateway) => gateway,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let handler = PredictionHandler::new(Arc::new(gateway), Arc::new(PredictionMetrics::new()))
        .allow_negative_amount(config.validation.allow_negative_amount);

    if args[2] == "random" {
        let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
        let fraud_rate = parse_fraud_rate(args.get(4).map(String::as_str))?;
        return run_random(&handler, count, fraud_rate);
    }

    let mut form = FormState::default();
    if args.len() == 3 {
        let preset = args[2].parse::<Preset>().map_err(anyhow::Error::msg)?;
        apply_preset(&mut form, preset);
    } else {
        form.fill(&parse_features(&args[2..])?);
    }

    match handler.submit(&form) {
        Ok(verdict) => println!("{}", render_verdict(&verdict)),
        Err(e) => {
            eprintln!("Prediction error: {}", e);
            std::process::exit(2);
        }
    }

    Ok(())
}
