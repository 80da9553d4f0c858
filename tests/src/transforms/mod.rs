mod control_flow;
mod proxies;
mod strings;
