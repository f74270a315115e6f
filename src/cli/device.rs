//! CLI `device` command — report which execution device a run would use.

use anyhow::Result;

use crate::config::SwisstextConfig;
use crate::embedding::device::{select_device, Capabilities};

pub fn device(config: &SwisstextConfig) -> Result<()> {
    let caps = Capabilities::probe();
    let selected = select_device(config.model.device, caps);

    println!("Execution providers:");
    println!("  CoreML:          {}", availability(caps.coreml));
    println!("  CUDA:            {}", availability(caps.cuda));
    println!("  CPU:             available");
    println!();
    println!("Preference:        {:?}", config.model.device);
    println!("Selected device:   {selected}");
    Ok(())
}

fn availability(available: bool) -> &'static str {
    if available {
        "available"
    } else {
        "not available"
    }
}
