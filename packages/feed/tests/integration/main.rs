mod live_feed;
mod publish;
