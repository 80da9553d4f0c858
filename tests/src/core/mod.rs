mod round_trip;
mod scopes;
