use rand::{Rng, SeedableRng, rngs::StdRng};
use switchplate::{RenderContext, Table, TableEntry, Value};

const REGIONS: [&str; 6] = [
    "us-east-1",
    "us-west-2",
    "eu-west-1",
    "eu-central-1",
    "ap-south-1",
    "sa-east-1",
];

/// Generate n random contexts to use in the benchmark
pub fn generate_random_contexts(n: usize) -> Vec<RenderContext<'static>> {
    let mut rng = StdRng::seed_from_u64(42); // Fixed seed for reproducibility
    let mut contexts = Vec::with_capacity(n);

    for _ in 0..n {
        let mut mapping = Table::new();
        for region in REGIONS {
            let mut amis = Table::new();
            amis.insert("stable", format!("ami-{}", random_string(&mut rng, 8, 8)));
            mapping.insert(region, TableEntry::Table(amis));
        }

        let access_logs = rng.random_bool(0.5);
        let mut context = RenderContext::new();
        context
            .set_flag("has_agent_parameters", rng.random_bool(0.7))
            .set_flag("master_external_loadbalancer", rng.random_bool(0.8))
            .set_flag("elb_access_logs", access_logs)
            .insert(
                "description",
                Value::string(random_string(&mut rng, 5, 20)),
            )
            .insert("region_to_ami_mapping", mapping)
            .insert("num_agents", Value::number(rng.random_range(1..50)))
            .insert("num_masters", Value::number(rng.random_range(1..=5)))
            .insert("extra_resources", Value::fragment(""));
        if access_logs {
            context.insert(
                "access_log_bucket",
                Value::string(random_string(&mut rng, 5, 10)),
            );
        }

        contexts.push(context);
    }

    contexts
}

/// Generate a random string with length between min and max
fn random_string(rng: &mut StdRng, min_len: usize, max_len: usize) -> String {
    let charset = "abcdefghijklmnopqrstuvwxyz";
    let len = rng.random_range(min_len..=max_len);

    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..charset.len());
            charset.chars().nth(idx).unwrap()
        })
        .collect()
}
