mod cli_args;
mod navigator;
mod references;
mod render;
