//! Emits the operator's `CustomResourceDefinition`s as multi-document YAML
//! on stdout, the standard `kube::CustomResource` companion binary (spec.md
//! SPEC_FULL.md §B): `cargo run --bin crdgen | kubectl apply -f -`.

fn main() -> anyhow::Result<()> {
    for crd in operator::crds() {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
