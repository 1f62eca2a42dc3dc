mod app;
mod input;
mod render;
mod settings;
mod sprites;
mod storage;

use anyhow::Result;

fn main() -> Result<()> {
    app::run()
}
