use super::{
    FamilySpec,
    FixedSeries,
    QueryPlan,
    AREA_ALL_LABELS,
    AREA_LABELS,
    ROLE_LABELS,
};

// Role codes: 90 province staff, 80 regency staff, 70 district staff, 60 village staff,
// 50 neighbourhood unit (RW). Status 10 is an active account.

const ROLE_TIERS: &[FixedSeries] = &[
    FixedSeries {
        labels: &["staffprov"],
        sql: "SELECT count(*) FROM user WHERE role = 90 AND status = 10 AND last_login_at IS NOT NULL",
    },
    FixedSeries {
        labels: &["staffkabkota"],
        sql: "SELECT count(*) FROM user WHERE role = 80 AND status = 10 AND last_login_at IS NOT NULL",
    },
    FixedSeries {
        labels: &["staffkecamatan"],
        sql: "SELECT count(*) FROM user WHERE role = 70 AND status = 10 AND last_login_at IS NOT NULL",
    },
    FixedSeries {
        labels: &["staffkelurahan"],
        sql: "SELECT count(*) FROM user WHERE role = 60 AND status = 10 AND last_login_at IS NOT NULL",
    },
    FixedSeries {
        labels: &["rw"],
        sql: "SELECT count(*) FROM user WHERE role = 50 AND status = 10 AND last_login_at IS NOT NULL",
    },
];

const LOGGED_IN_AREA: &str = "
    SELECT b.name, count(*) FROM user a
    JOIN areas b ON a.kabkota_id = b.id
    WHERE a.role = 50 AND a.status = 10 AND a.last_login_at IS NOT NULL
    GROUP BY a.kabkota_id";

const LOGGED_IN_AREA_ALL: &str = "
    SELECT b.name, c.name, d.name, COALESCE(d.latitude, ''), COALESCE(d.longitude, ''), count(*) FROM user a
    JOIN areas b ON a.kabkota_id = b.id
    JOIN areas c ON a.kec_id = c.id
    JOIN areas d ON a.kel_id = d.id
    WHERE a.role = 50 AND a.status = 10 AND a.last_login_at IS NOT NULL
    GROUP BY a.kabkota_id, a.kec_id, a.kel_id";

const RECENT_ACTIVE_AREA: &str = "
    SELECT b.name, count(*) FROM user a
    JOIN areas b ON a.kabkota_id = b.id
    WHERE a.role = 50 AND a.last_access_at >= DATE_SUB(NOW(), INTERVAL 5 MINUTE)
    GROUP BY a.kabkota_id";

const RECENT_ACTIVE_AREA_ALL: &str = "
    SELECT b.name, c.name, d.name, COALESCE(d.latitude, ''), COALESCE(d.longitude, ''), count(*) FROM user a
    JOIN areas b ON a.kabkota_id = b.id
    JOIN areas c ON a.kec_id = c.id
    JOIN areas d ON a.kel_id = d.id
    WHERE a.role = 50 AND a.status = 10 AND a.last_access_at >= DATE_SUB(NOW(), INTERVAL 5 MINUTE)
    GROUP BY a.kabkota_id, a.kec_id, a.kel_id";

const DAILY_ACTIVE_AREA: &str = "
    SELECT b.name, count(*) FROM user a
    JOIN areas b ON a.kabkota_id = b.id
    WHERE a.role = 50 AND DATE(a.last_access_at) = DATE(NOW())
    GROUP BY a.kabkota_id";

const DAILY_ACTIVE_AREA_ALL: &str = "
    SELECT b.name, c.name, d.name, COALESCE(d.latitude, ''), COALESCE(d.longitude, ''), count(*) FROM user a
    JOIN areas b ON a.kabkota_id = b.id
    JOIN areas c ON a.kec_id = c.id
    JOIN areas d ON a.kel_id = d.id
    WHERE a.role = 50 AND a.status = 10 AND DATE(a.last_access_at) = DATE(NOW())
    GROUP BY a.kabkota_id, a.kec_id, a.kel_id";

// ISO weeks (mode 1: weeks start on Monday).
const WEEKLY_ACTIVE_AREA: &str = "
    SELECT b.name, count(*) FROM user a
    JOIN areas b ON a.kabkota_id = b.id
    WHERE a.role = 50 AND YEARWEEK(a.last_access_at, 1) = YEARWEEK(CURDATE(), 1)
    GROUP BY a.kabkota_id";

const WEEKLY_ACTIVE_AREA_ALL: &str = "
    SELECT b.name, c.name, d.name, COALESCE(d.latitude, ''), COALESCE(d.longitude, ''), count(*) FROM user a
    JOIN areas b ON a.kabkota_id = b.id
    JOIN areas c ON a.kec_id = c.id
    JOIN areas d ON a.kel_id = d.id
    WHERE a.role = 50 AND a.status = 10 AND YEARWEEK(a.last_access_at, 1) = YEARWEEK(CURDATE(), 1)
    GROUP BY a.kabkota_id, a.kec_id, a.kel_id";

const MONTHLY_ACTIVE_AREA: &str = "
    SELECT b.name, count(*) FROM user a
    JOIN areas b ON a.kabkota_id = b.id
    WHERE a.role = 50 AND a.last_access_at >= DATE_FORMAT(NOW(), '%Y-%m-01')
    GROUP BY a.kabkota_id";

const MONTHLY_ACTIVE_AREA_ALL: &str = "
    SELECT b.name, c.name, d.name, COALESCE(d.latitude, ''), COALESCE(d.longitude, ''), count(*) FROM user a
    JOIN areas b ON a.kabkota_id = b.id
    JOIN areas c ON a.kec_id = c.id
    JOIN areas d ON a.kel_id = d.id
    WHERE a.role = 50 AND a.status = 10 AND a.last_access_at >= DATE_FORMAT(NOW(), '%Y-%m-01')
    GROUP BY a.kabkota_id, a.kec_id, a.kel_id";

const POSTS_AREA: &str = "
    SELECT c.name, count(*) FROM user_posts a
    JOIN user b ON a.created_by = b.id
    JOIN areas c ON b.kabkota_id = c.id
    GROUP BY b.kabkota_id";

pub static CATALOGUE: [FamilySpec; 12] = [
    FamilySpec {
        name: "users_loggedin_role",
        help: "Logged in users by roles",
        labels: ROLE_LABELS,
        plan: QueryPlan::Fixed(ROLE_TIERS),
    },
    FamilySpec {
        name: "users_loggedin_area",
        help: "Logged in users by area",
        labels: AREA_LABELS,
        plan: QueryPlan::Grouped(LOGGED_IN_AREA),
    },
    FamilySpec {
        name: "users_loggedin_area_all",
        help: "Logged in users by area all",
        labels: AREA_ALL_LABELS,
        plan: QueryPlan::Grouped(LOGGED_IN_AREA_ALL),
    },
    FamilySpec {
        name: "users_recent_active",
        help: "Recent active users by area",
        labels: AREA_LABELS,
        plan: QueryPlan::Grouped(RECENT_ACTIVE_AREA),
    },
    FamilySpec {
        name: "users_recent_active_all",
        help: "Recent active users by area all",
        labels: AREA_ALL_LABELS,
        plan: QueryPlan::Grouped(RECENT_ACTIVE_AREA_ALL),
    },
    FamilySpec {
        name: "users_active_daily",
        help: "Daily active users by area",
        labels: AREA_LABELS,
        plan: QueryPlan::Grouped(DAILY_ACTIVE_AREA),
    },
    FamilySpec {
        name: "users_active_daily_all",
        help: "Daily active users by area all",
        labels: AREA_ALL_LABELS,
        plan: QueryPlan::Grouped(DAILY_ACTIVE_AREA_ALL),
    },
    FamilySpec {
        name: "users_active_weekly",
        help: "Weekly active users by area",
        labels: AREA_LABELS,
        plan: QueryPlan::Grouped(WEEKLY_ACTIVE_AREA),
    },
    FamilySpec {
        name: "users_active_weekly_all",
        help: "Weekly active users by area all",
        labels: AREA_ALL_LABELS,
        plan: QueryPlan::Grouped(WEEKLY_ACTIVE_AREA_ALL),
    },
    FamilySpec {
        name: "users_active_monthly",
        help: "Monthly active users by area",
        labels: AREA_LABELS,
        plan: QueryPlan::Grouped(MONTHLY_ACTIVE_AREA),
    },
    FamilySpec {
        name: "users_active_monthly_all",
        help: "Monthly active users by area_all",
        labels: AREA_ALL_LABELS,
        plan: QueryPlan::Grouped(MONTHLY_ACTIVE_AREA_ALL),
    },
    FamilySpec {
        name: "users_posts",
        help: "Recent user posts by area",
        labels: AREA_LABELS,
        plan: QueryPlan::Grouped(POSTS_AREA),
    },
];
