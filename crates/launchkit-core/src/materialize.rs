//! Writes the generated project to disk.
//!
//! Each generator owns one concern of the output tree (package manifest,
//! landing page, auth wiring, ...) and returns the files it wants written.
//! A failing generator is recorded in the report and the rest still run;
//! only problems with the output directory itself are fatal.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::assistant::{display_name, GeneratedContent};
use crate::context::WizardContext;
use crate::error::{LaunchError, Result};
use crate::types::{Analytics, Audience, Feature, IdeaSource, PricingModel, Tone};

/// Name of the manifest written at the project root.
pub const MANIFEST_FILE: &str = "launchkit.yaml";

type Files = Vec<(String, String)>;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFailure {
    pub module: &'static str,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct MaterializeReport {
    pub output_path: PathBuf,
    /// Paths relative to `output_path`, in write order.
    pub files: Vec<String>,
    pub errors: Vec<ModuleFailure>,
}

impl MaterializeReport {
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Generator table
// ---------------------------------------------------------------------------

struct Generator {
    id: &'static str,
    enabled: fn(&WizardContext) -> bool,
    run: fn(&WizardContext, &GeneratedContent) -> Result<Files>,
}

fn always(_: &WizardContext) -> bool {
    true
}

const GENERATORS: &[Generator] = &[
    Generator { id: "package", enabled: always, run: package },
    Generator { id: "config", enabled: always, run: config },
    Generator { id: "layout", enabled: always, run: layout },
    Generator { id: "landing", enabled: always, run: landing },
    Generator {
        id: "database",
        enabled: |c| {
            c.features.has(Feature::Authentication)
                || c.features.has(Feature::Waitlist)
                || c.features.charges()
        },
        run: database,
    },
    Generator { id: "auth", enabled: |c| c.features.has(Feature::Authentication), run: auth },
    Generator { id: "payments", enabled: |c| c.features.charges(), run: payments },
    Generator { id: "email", enabled: |c| c.features.has(Feature::Email), run: email },
    Generator { id: "blog", enabled: |c| c.features.has(Feature::Blog), run: blog },
    Generator { id: "waitlist", enabled: |c| c.features.has(Feature::Waitlist), run: waitlist },
    Generator {
        id: "analytics",
        enabled: |c| c.features.analytics != Analytics::None,
        run: analytics,
    },
    Generator { id: "env", enabled: always, run: env_example },
    Generator { id: "readme", enabled: always, run: readme },
    Generator { id: "manifest", enabled: always, run: manifest },
];

/// Create `out_dir` and write the project for `ctx` into it.
pub fn materialize(ctx: &WizardContext, out_dir: &Path) -> Result<MaterializeReport> {
    run_generators(ctx, out_dir, GENERATORS)
}

fn run_generators(
    ctx: &WizardContext,
    out_dir: &Path,
    generators: &[Generator],
) -> Result<MaterializeReport> {
    if out_dir.exists() {
        return Err(LaunchError::OutputExists(out_dir.to_path_buf()));
    }
    std::fs::create_dir_all(out_dir).map_err(|source| LaunchError::CreateOutput {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let content = if ctx.content.is_empty() {
        GeneratedContent::placeholder(ctx)
    } else {
        ctx.content.clone().or_fill(GeneratedContent::placeholder(ctx))
    };

    let mut report = MaterializeReport {
        output_path: out_dir.to_path_buf(),
        files: Vec::new(),
        errors: Vec::new(),
    };
    for g in generators.iter().filter(|g| (g.enabled)(ctx)) {
        let files = match (g.run)(ctx, &content) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(module = g.id, error = %e, "generator failed");
                report.errors.push(ModuleFailure {
                    module: g.id,
                    message: e.to_string(),
                });
                continue;
            }
        };
        // Write failures are fatal; only generator errors are collected.
        for (rel, body) in files {
            write_file(out_dir, &rel, &body)?;
            report.files.push(rel);
        }
        tracing::debug!(module = g.id, "generated");
    }
    Ok(report)
}

fn write_file(root: &Path, rel: &str, body: &str) -> Result<()> {
    let path = root.join(rel);
    let wrap = |source: std::io::Error| LaunchError::WriteOutput {
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    std::fs::write(&path, body).map_err(wrap)?;
    Ok(())
}

/// A JSON string literal, which is also a valid JS/TS string literal.
fn js(s: &str) -> Result<String> {
    Ok(serde_json::to_string(s)?)
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn package(ctx: &WizardContext, _: &GeneratedContent) -> Result<Files> {
    let mut deps = serde_json::Map::new();
    let mut add = |name: &str, version: &str| {
        deps.insert(name.to_string(), json!(version));
    };
    add("next", "^14.2.0");
    add("react", "^18.3.0");
    add("react-dom", "^18.3.0");
    let f = &ctx.features;
    if f.has(Feature::Authentication) || f.has(Feature::Waitlist) || f.charges() {
        add("drizzle-orm", "^0.33.0");
        add("postgres", "^3.4.0");
    }
    if f.has(Feature::Authentication) {
        add("next-auth", "^4.24.0");
    }
    if f.charges() {
        add("stripe", "^16.0.0");
    }
    if f.has(Feature::Email) {
        add("resend", "^4.0.0");
    }
    if f.has(Feature::Blog) {
        add("gray-matter", "^4.0.3");
    }
    if f.analytics == Analytics::PostHog {
        add("posthog-js", "^1.160.0");
    }

    let pkg = json!({
        "name": ctx.name,
        "version": "0.1.0",
        "private": true,
        "description": ctx.description,
        "scripts": {
            "dev": "next dev",
            "build": "next build",
            "start": "next start",
            "lint": "next lint"
        },
        "dependencies": deps,
        "devDependencies": {
            "typescript": "^5.5.0",
            "@types/node": "^20.0.0",
            "@types/react": "^18.3.0",
            "tailwindcss": "^3.4.0",
            "postcss": "^8.4.0",
            "autoprefixer": "^10.4.0"
        }
    });
    Ok(vec![(
        "package.json".into(),
        serde_json::to_string_pretty(&pkg)? + "\n",
    )])
}

fn config(ctx: &WizardContext, _: &GeneratedContent) -> Result<Files> {
    let tsconfig = json!({
        "compilerOptions": {
            "target": "ES2020",
            "lib": ["dom", "dom.iterable", "esnext"],
            "strict": true,
            "module": "esnext",
            "moduleResolution": "bundler",
            "jsx": "preserve",
            "noEmit": true,
            "paths": { "@/*": ["./src/*"] }
        },
        "include": ["next-env.d.ts", "**/*.ts", "**/*.tsx"],
        "exclude": ["node_modules"]
    });
    let tailwind = format!(
        "/** @type {{import('tailwindcss').Config}} */\n\
         module.exports = {{\n{dark}  content: ['./src/**/*.{{ts,tsx,md}}'],\n  \
         theme: {{ extend: {{ colors: {{ primary: {color} }} }} }},\n  plugins: [],\n}};\n",
        dark = if ctx.features.has(Feature::DarkMode) {
            "  darkMode: 'class',\n"
        } else {
            ""
        },
        color = js(&ctx.branding.primary_color)?
    );
    Ok(vec![
        ("tsconfig.json".into(), serde_json::to_string_pretty(&tsconfig)? + "\n"),
        ("tailwind.config.js".into(), tailwind),
        (
            "postcss.config.js".into(),
            "module.exports = { plugins: { tailwindcss: {}, autoprefixer: {} } };\n".into(),
        ),
        (
            "next.config.js".into(),
            "/** @type {import('next').NextConfig} */\nmodule.exports = { reactStrictMode: true };\n"
                .into(),
        ),
        (
            ".gitignore".into(),
            "node_modules/\n.next/\n.env\n.env.local\n".into(),
        ),
    ])
}

fn layout(ctx: &WizardContext, content: &GeneratedContent) -> Result<Files> {
    let script = match ctx.features.analytics {
        Analytics::None => String::new(),
        _ => "        <Analytics />\n".to_string(),
    };
    let import = match ctx.features.analytics {
        Analytics::None => String::new(),
        _ => "import { Analytics } from '@/lib/analytics';\n".to_string(),
    };
    let body = format!(
        "import './globals.css';\n{import}\n\
         export const metadata = {{\n  title: {title},\n  description: {desc},\n  keywords: {keywords},\n}};\n\n\
         export default function RootLayout({{ children }}: {{ children: React.ReactNode }}) {{\n  \
         return (\n    <html lang=\"en\">\n      <body>\n        {{children}}\n{script}      </body>\n    </html>\n  );\n}}\n",
        title = js(&display_name(&ctx.name))?,
        desc = js(&content.subheadline)?,
        keywords = serde_json::to_string(&content.seo_keywords)?,
    );
    Ok(vec![
        ("src/app/layout.tsx".into(), body),
        (
            "src/app/globals.css".into(),
            "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n".into(),
        ),
    ])
}

fn landing(ctx: &WizardContext, content: &GeneratedContent) -> Result<Files> {
    let mut cards = String::new();
    for f in &content.features {
        cards.push_str(&format!(
            "        <div className=\"rounded-lg border p-6\">\n          <h3 className=\"font-semibold\">{{{}}}</h3>\n          <p>{{{}}}</p>\n        </div>\n",
            js(&f.title)?,
            js(&f.description)?
        ));
    }
    let cta_href = if ctx.features.has(Feature::Waitlist) {
        "/#waitlist"
    } else if ctx.features.has(Feature::Authentication) {
        "/login"
    } else {
        "#"
    };
    let waitlist = if ctx.features.has(Feature::Waitlist) {
        "      <WaitlistForm />\n"
    } else {
        ""
    };
    let waitlist_import = if ctx.features.has(Feature::Waitlist) {
        "import { WaitlistForm } from '@/components/waitlist-form';\n\n"
    } else {
        ""
    };
    let page = format!(
        "{waitlist_import}export default function Home() {{\n  return (\n    <main className=\"mx-auto max-w-5xl px-6 py-24\">\n      \
         <p className=\"text-primary\">{{{tagline}}}</p>\n      <h1 className=\"text-5xl font-bold\">{{{headline}}}</h1>\n      \
         <p className=\"mt-4 text-lg\">{{{sub}}}</p>\n      <a href=\"{cta_href}\" className=\"mt-8 inline-block rounded bg-primary px-6 py-3 text-white\">{{{cta}}}</a>\n      \
         <section className=\"mt-16 grid gap-6 md:grid-cols-3\">\n{cards}      </section>\n{waitlist}    </main>\n  );\n}}\n",
        tagline = js(&content.tagline)?,
        headline = js(&content.headline)?,
        sub = js(&content.subheadline)?,
        cta = js(&content.cta)?,
    );
    Ok(vec![("src/app/page.tsx".into(), page)])
}

fn database(ctx: &WizardContext, _: &GeneratedContent) -> Result<Files> {
    let mut schema = String::from(
        "import { pgTable, serial, text, timestamp } from 'drizzle-orm/pg-core';\n",
    );
    if ctx.features.has(Feature::Authentication) {
        schema.push_str(
            "\nexport const users = pgTable('users', {\n  id: serial('id').primaryKey(),\n  email: text('email').notNull().unique(),\n  name: text('name'),\n  createdAt: timestamp('created_at').defaultNow(),\n});\n",
        );
    }
    if ctx.features.charges() {
        schema.push_str(
            "\nexport const subscriptions = pgTable('subscriptions', {\n  id: serial('id').primaryKey(),\n  userEmail: text('user_email').notNull(),\n  stripeCustomerId: text('stripe_customer_id'),\n  status: text('status').notNull(),\n});\n",
        );
    }
    if ctx.features.has(Feature::Waitlist) {
        schema.push_str(
            "\nexport const waitlist = pgTable('waitlist', {\n  id: serial('id').primaryKey(),\n  email: text('email').notNull().unique(),\n  createdAt: timestamp('created_at').defaultNow(),\n});\n",
        );
    }
    Ok(vec![
        ("src/db/schema.ts".into(), schema),
        (
            "src/db/index.ts".into(),
            "import { drizzle } from 'drizzle-orm/postgres-js';\nimport postgres from 'postgres';\nimport * as schema from './schema';\n\n\
             export const db = drizzle(postgres(process.env.DATABASE_URL!), { schema });\n"
                .into(),
        ),
    ])
}

fn auth(_: &WizardContext, _: &GeneratedContent) -> Result<Files> {
    Ok(vec![
        (
            "src/lib/auth.ts".into(),
            "import type { NextAuthOptions } from 'next-auth';\nimport GitHub from 'next-auth/providers/github';\n\n\
             export const authOptions: NextAuthOptions = {\n  providers: [\n    GitHub({\n      clientId: process.env.GITHUB_ID!,\n      clientSecret: process.env.GITHUB_SECRET!,\n    }),\n  ],\n};\n"
                .into(),
        ),
        (
            "src/app/api/auth/[...nextauth]/route.ts".into(),
            "import NextAuth from 'next-auth';\nimport { authOptions } from '@/lib/auth';\n\nconst handler = NextAuth(authOptions);\nexport { handler as GET, handler as POST };\n"
                .into(),
        ),
    ])
}

fn payments(ctx: &WizardContext, _: &GeneratedContent) -> Result<Files> {
    let mode = match ctx.features.pricing {
        PricingModel::OneTime => "payment",
        _ => "subscription",
    };
    Ok(vec![
        (
            "src/lib/stripe.ts".into(),
            "import Stripe from 'stripe';\n\nexport const stripe = new Stripe(process.env.STRIPE_SECRET_KEY!);\n".into(),
        ),
        (
            "src/app/api/checkout/route.ts".into(),
            format!(
                "import {{ stripe }} from '@/lib/stripe';\n\n\
                 // {pricing} pricing\n\
                 export async function POST(req: Request) {{\n  const {{ priceId }} = await req.json();\n  \
                 const session = await stripe.checkout.sessions.create({{\n    mode: '{mode}',\n    \
                 line_items: [{{ price: priceId, quantity: 1 }}],\n    \
                 success_url: `${{process.env.NEXT_PUBLIC_APP_URL}}/?checkout=success`,\n    \
                 cancel_url: `${{process.env.NEXT_PUBLIC_APP_URL}}/?checkout=cancelled`,\n  }});\n  \
                 return Response.json({{ url: session.url }});\n}}\n",
                pricing = ctx.features.pricing.label(),
            ),
        ),
    ])
}

fn email(ctx: &WizardContext, _: &GeneratedContent) -> Result<Files> {
    Ok(vec![(
        "src/lib/email.ts".into(),
        format!(
            "import {{ Resend }} from 'resend';\n\nconst resend = new Resend(process.env.RESEND_API_KEY);\n\n\
             export async function sendEmail(to: string, subject: string, html: string) {{\n  \
             return resend.emails.send({{ from: {from}, to, subject, html }});\n}}\n",
            from = js(&format!("{} <hello@{}.com>", display_name(&ctx.name), ctx.name))?,
        ),
    )])
}

fn blog(ctx: &WizardContext, _: &GeneratedContent) -> Result<Files> {
    let date = Utc::now().format("%Y-%m-%d");
    Ok(vec![
        (
            "content/blog/hello-world.md".into(),
            format!(
                "---\ntitle: Introducing {}\ndate: {date}\n---\n\n{}\n",
                display_name(&ctx.name),
                ctx.description
            ),
        ),
        (
            "src/app/blog/page.tsx".into(),
            "import fs from 'node:fs';\nimport path from 'node:path';\nimport matter from 'gray-matter';\n\n\
             export default function Blog() {\n  const dir = path.join(process.cwd(), 'content/blog');\n  \
             const posts = fs.readdirSync(dir).map((f) => ({ slug: f.replace(/\\.md$/, ''), ...matter.read(path.join(dir, f)).data }));\n  \
             return (\n    <ul>\n      {posts.map((p) => <li key={p.slug}>{String(p.title)}</li>)}\n    </ul>\n  );\n}\n"
                .into(),
        ),
    ])
}

fn waitlist(_: &WizardContext, _: &GeneratedContent) -> Result<Files> {
    Ok(vec![
        (
            "src/components/waitlist-form.tsx".into(),
            "'use client';\nimport { useState } from 'react';\n\n\
             export function WaitlistForm() {\n  const [email, setEmail] = useState('');\n  const [done, setDone] = useState(false);\n  \
             async function submit(e: React.FormEvent) {\n    e.preventDefault();\n    \
             await fetch('/api/waitlist', { method: 'POST', body: JSON.stringify({ email }) });\n    setDone(true);\n  }\n  \
             if (done) return <p id=\"waitlist\">You're on the list.</p>;\n  \
             return (\n    <form id=\"waitlist\" onSubmit={submit}>\n      <input type=\"email\" value={email} onChange={(e) => setEmail(e.target.value)} required />\n      <button type=\"submit\">Join the waitlist</button>\n    </form>\n  );\n}\n"
                .into(),
        ),
        (
            "src/app/api/waitlist/route.ts".into(),
            "import { db } from '@/db';\nimport { waitlist } from '@/db/schema';\n\n\
             export async function POST(req: Request) {\n  const { email } = await req.json();\n  \
             await db.insert(waitlist).values({ email }).onConflictDoNothing();\n  return Response.json({ ok: true });\n}\n"
                .into(),
        ),
    ])
}

fn analytics(ctx: &WizardContext, _: &GeneratedContent) -> Result<Files> {
    let body = match ctx.features.analytics {
        Analytics::None => return Ok(Vec::new()),
        Analytics::Plausible => format!(
            "import Script from 'next/script';\n\nexport function Analytics() {{\n  \
             return <Script defer data-domain={{{}}} src=\"https://plausible.io/js/script.js\" />;\n}}\n",
            js(&format!("{}.com", ctx.name))?
        ),
        Analytics::PostHog => "'use client';\nimport posthog from 'posthog-js';\nimport { useEffect } from 'react';\n\n\
             export function Analytics() {\n  useEffect(() => {\n    \
             posthog.init(process.env.NEXT_PUBLIC_POSTHOG_KEY!, { api_host: 'https://app.posthog.com' });\n  }, []);\n  return null;\n}\n"
            .to_string(),
        Analytics::GoogleAnalytics => "import Script from 'next/script';\n\nexport function Analytics() {\n  \
             const id = process.env.NEXT_PUBLIC_GA_ID;\n  return (\n    <>\n      \
             <Script src={`https://www.googletagmanager.com/gtag/js?id=${id}`} />\n      \
             <Script id=\"ga\">{`window.dataLayer=window.dataLayer||[];function gtag(){dataLayer.push(arguments);}gtag('js',new Date());gtag('config','${id}');`}</Script>\n    </>\n  );\n}\n"
            .to_string(),
    };
    Ok(vec![("src/lib/analytics.tsx".into(), body)])
}

fn env_example(ctx: &WizardContext, _: &GeneratedContent) -> Result<Files> {
    let f = &ctx.features;
    let mut lines = vec!["NEXT_PUBLIC_APP_URL=http://localhost:3000".to_string()];
    if f.has(Feature::Authentication) || f.has(Feature::Waitlist) || f.charges() {
        lines.push(format!("DATABASE_URL=postgres://localhost:5432/{}", ctx.name.replace('-', "_")));
    }
    if f.has(Feature::Authentication) {
        lines.extend(["NEXTAUTH_SECRET=", "GITHUB_ID=", "GITHUB_SECRET="].map(String::from));
    }
    if f.charges() {
        lines.extend(["STRIPE_SECRET_KEY=", "STRIPE_WEBHOOK_SECRET="].map(String::from));
    }
    if f.has(Feature::Email) {
        lines.push("RESEND_API_KEY=".into());
    }
    match f.analytics {
        Analytics::PostHog => lines.push("NEXT_PUBLIC_POSTHOG_KEY=".into()),
        Analytics::GoogleAnalytics => lines.push("NEXT_PUBLIC_GA_ID=".into()),
        Analytics::None | Analytics::Plausible => {}
    }
    Ok(vec![(".env.example".into(), lines.join("\n") + "\n")])
}

fn readme(ctx: &WizardContext, content: &GeneratedContent) -> Result<Files> {
    let mut out = format!(
        "# {}\n\n> {}\n\n{}\n\n## Stack\n\n- Next.js + TypeScript + Tailwind CSS\n",
        display_name(&ctx.name),
        content.tagline,
        ctx.description
    );
    for f in &ctx.features.features {
        out.push_str(&format!("- {}\n", f.label()));
    }
    if ctx.features.has(Feature::Payments) {
        out.push_str(&format!("\nPricing: {}\n", ctx.features.pricing.label()));
    }
    if let Some(research) = ctx.current_research() {
        if !research.competitors.is_empty() {
            out.push_str("\n## Competitors\n\n");
            for c in &research.competitors {
                if c.url.is_empty() {
                    out.push_str(&format!("- {}\n", c.name));
                } else {
                    out.push_str(&format!("- [{}]({})\n", c.name, c.url));
                }
            }
        }
    }
    out.push_str("\n## Getting started\n\n```sh\ncp .env.example .env.local\nnpm install\nnpm run dev\n```\n");
    Ok(vec![("README.md".into(), out)])
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    name: &'a str,
    description: &'a str,
    generated_at: DateTime<Utc>,
    generator_version: &'static str,
    idea_source: IdeaSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    audience: Option<Audience>,
    features: Vec<&'static str>,
    pricing: PricingModel,
    analytics: Analytics,
    primary_color: &'a str,
    tone: Tone,
    ai_content: bool,
}

fn manifest(ctx: &WizardContext, _: &GeneratedContent) -> Result<Files> {
    let m = Manifest {
        name: &ctx.name,
        description: &ctx.description,
        generated_at: Utc::now(),
        generator_version: env!("CARGO_PKG_VERSION"),
        idea_source: ctx.idea_source,
        audience: ctx.audience,
        features: ctx.features.features.iter().map(|f| f.as_str()).collect(),
        pricing: ctx.features.pricing,
        analytics: ctx.features.analytics,
        primary_color: &ctx.branding.primary_color,
        tone: ctx.branding.tone,
        ai_content: ctx.content_generated && !ctx.content.is_empty(),
    };
    Ok(vec![(MANIFEST_FILE.into(), serde_yaml::to_string(&m)?)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FeatureSelection;
    use tempfile::TempDir;

    fn ctx(features: Vec<Feature>) -> WizardContext {
        WizardContext {
            name: "acme-notes".into(),
            description: "Shared notes for remote teams".into(),
            idea_source: IdeaSource::Direct,
            features: FeatureSelection {
                features,
                pricing: PricingModel::Subscription,
                analytics: Analytics::Plausible,
            },
            ..Default::default()
        }
    }

    fn read(dir: &Path, rel: &str) -> String {
        std::fs::read_to_string(dir.join(rel)).unwrap()
    }

    #[test]
    fn writes_enabled_modules_only() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("acme-notes");
        let report = materialize(&ctx(vec![Feature::Authentication]), &out).unwrap();

        assert!(!report.is_partial());
        assert!(report.files.contains(&"src/lib/auth.ts".to_string()));
        assert!(report.files.contains(&"src/db/schema.ts".to_string()));
        assert!(!report.files.iter().any(|f| f.contains("stripe")));
        assert!(!out.join("src/components/waitlist-form.tsx").exists());
        assert!(read(&out, "package.json").contains("\"next-auth\""));
    }

    #[test]
    fn free_pricing_skips_payments() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("p");
        let mut c = ctx(vec![Feature::Payments]);
        c.features.pricing = PricingModel::Free;
        let report = materialize(&c, &out).unwrap();
        assert!(!report.files.contains(&"src/lib/stripe.ts".to_string()));
        assert!(!read(&out, ".env.example").contains("STRIPE"));
    }

    #[test]
    fn empty_content_uses_placeholder() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("p");
        materialize(&ctx(vec![]), &out).unwrap();
        let page = read(&out, "src/app/page.tsx");
        assert!(page.contains("Acme Notes"));
        assert!(page.contains("Get started"));
    }

    #[test]
    fn copy_is_escaped_in_tsx() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("p");
        let mut c = ctx(vec![]);
        c.content = GeneratedContent {
            headline: "Say \"hi\" {now}".into(),
            ..Default::default()
        };
        materialize(&c, &out).unwrap();
        assert!(read(&out, "src/app/page.tsx").contains(r#"{"Say \"hi\" {now}"}"#));
    }

    #[test]
    fn manifest_records_selection() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("p");
        materialize(&ctx(vec![Feature::Blog]), &out).unwrap();
        let yaml: serde_yaml::Value = serde_yaml::from_str(&read(&out, MANIFEST_FILE)).unwrap();
        assert_eq!(yaml["name"].as_str(), Some("acme-notes"));
        assert_eq!(yaml["features"][0].as_str(), Some("blog"));
        assert_eq!(yaml["analytics"].as_str(), Some("plausible"));
    }

    #[test]
    fn existing_directory_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = materialize(&ctx(vec![]), tmp.path()).unwrap_err();
        assert!(matches!(err, LaunchError::OutputExists(_)));
    }

    #[test]
    fn failing_module_is_reported_and_others_run() {
        fn broken(_: &WizardContext, _: &GeneratedContent) -> Result<Files> {
            Err(LaunchError::Io(std::io::Error::other("template missing")))
        }
        let table = [
            Generator { id: "broken", enabled: always, run: broken },
            Generator { id: "readme", enabled: always, run: readme },
        ];
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("p");
        let report = run_generators(&ctx(vec![]), &out, &table).unwrap();

        assert!(report.is_partial());
        assert_eq!(report.errors[0].module, "broken");
        assert!(report.errors[0].message.contains("template missing"));
        assert_eq!(report.files, vec!["README.md".to_string()]);
    }

    #[test]
    fn write_failure_is_fatal() {
        fn file(_: &WizardContext, _: &GeneratedContent) -> Result<Files> {
            Ok(vec![("blocker".into(), "x".into())])
        }
        fn nested(_: &WizardContext, _: &GeneratedContent) -> Result<Files> {
            Ok(vec![("blocker/inner.txt".into(), "y".into())])
        }
        let table = [
            Generator { id: "a", enabled: always, run: file },
            Generator { id: "b", enabled: always, run: nested },
        ];
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("p");
        match run_generators(&ctx(vec![]), &out, &table) {
            Err(LaunchError::WriteOutput { path, .. }) => {
                assert!(path.ends_with("blocker/inner.txt"), "{}", path.display());
            }
            other => panic!("expected WriteOutput, got {other:?}"),
        }
    }
}
