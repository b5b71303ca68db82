use clap::Parser;

#[derive(Parser, Clone)]
pub struct Config {
    #[clap(env, long, default_value = "development")]
    pub environment: String,

    #[clap(env, long)]
    pub database_url: String,

    #[clap(env, long, default_value = "http://localhost:3000")]
    pub origin_urls: String,

    // Empty credential disables the matching provider: its adapter reports
    // "no result" instead of erroring.
    #[clap(env, long, default_value = "")]
    pub yelp_api_key: String,

    #[clap(env, long, default_value = "")]
    pub google_places_key: String,

    #[clap(env, long, default_value = "")]
    pub geoapify_key: String,

    #[clap(env, long, default_value = "")]
    pub openrouter_api_key: String,

    #[clap(env, long, default_value = "")]
    pub unsplash_key: String,
}
