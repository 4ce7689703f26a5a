//! 统计数据根目录下各数据集的 patch / 组合个数.
//!
//! 数据根目录见 [`utils::loader::data_dir_from_env_or_home`].

mod result;
mod runner;

fn main() {
    simple_logger::init_with_env().expect("Logger initialization error");
    println!("Collecting dataset statistics...");
    runner::run().analyze();
}
