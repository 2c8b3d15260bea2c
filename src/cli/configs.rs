use anyhow::{bail, Result};
use clap::Args;

use lazybench::catalog::Family;
use lazybench::matrix::{generate, LabelMap};

use super::{init_logging, AxisArgs};

#[derive(Args, Debug, Clone)]
pub struct ConfigsArgs {
    // cilk5 | pbbs | pbbs_v2
    #[arg(long, default_value = "pbbs_v2")]
    pub family: String,

    #[command(flatten)]
    pub axes: AxisArgs,
}

pub fn run_configs(args: ConfigsArgs) -> Result<()> {
    init_logging(None)?;

    let family = match Family::from_tag(&args.family) {
        Some(f) => f,
        None => bail!("unknown benchmark family {:?}", args.family),
    };
    let labels = LabelMap::standard();
    let valid = generate(family.validity(), &args.axes.axes()?);

    println!("{} VALID CONFIGURATIONS FOR {}", valid.len(), family.tag());
    println!();
    println!(
        "  {:<7}{:<22}{:<7}{:<7}{:<9}LABEL",
        "SUFFIX", "SCHEDULER", "NOOPT", "FINE", "LOWERING"
    );
    for (cfg, suffix) in &valid {
        println!(
            "  {:<7}{:<22}{:<7}{:<7}{:<9}{}",
            suffix,
            cfg.scheduler.name(),
            cfg.noopt,
            cfg.fine_grain,
            cfg.lowering.name(),
            labels.display(&cfg.composite_label()),
        );
    }
    Ok(())
}
